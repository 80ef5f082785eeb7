// Angle/velocity covariance for the rotor observer
// Fixed 2x2 storage, column-major, all operations unrolled

/// Column-major 2x2 matrix: [m00, m10, m01, m11]
type Mat2 = [f32; 4];

#[inline]
fn mul(a: &Mat2, b: &Mat2) -> Mat2 {
    [
        a[0] * b[0] + a[2] * b[1],
        a[1] * b[0] + a[3] * b[1],
        a[0] * b[2] + a[2] * b[3],
        a[1] * b[2] + a[3] * b[3],
    ]
}

#[inline]
fn transpose(a: &Mat2) -> Mat2 {
    [a[0], a[2], a[1], a[3]]
}

/// Correction gain produced by a measurement update.
///
/// Maps the (d, q) current residual onto the (angle, velocity) state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain2 {
    /// Column-major [k_θd, k_ωd, k_θq, k_ωq]
    pub k: [f32; 4],
}

impl Gain2 {
    /// Apply the gain to a residual, returning (Δangle, Δvelocity)
    #[inline]
    pub fn apply(&self, residual_d: f32, residual_q: f32) -> (f32, f32) {
        (
            self.k[0] * residual_d + self.k[2] * residual_q,
            self.k[1] * residual_d + self.k[3] * residual_q,
        )
    }
}

/// State covariance over (angle, velocity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Covariance2 {
    m: Mat2,
}

impl Covariance2 {
    /// Symmetric covariance with the given diagonal and off-diagonal entries
    pub const fn new(diag: f32, off_diag: f32) -> Self {
        Self {
            m: [diag, off_diag, off_diag, diag],
        }
    }

    /// Raw column-major entries
    pub fn as_array(&self) -> [f32; 4] {
        self.m
    }

    /// Angle variance [rad²]
    #[inline]
    pub fn angle_variance(&self) -> f32 {
        self.m[0]
    }

    /// Velocity variance [(rad/s)²]
    #[inline]
    pub fn velocity_variance(&self) -> f32 {
        self.m[3]
    }

    #[inline]
    pub fn determinant(&self) -> f32 {
        self.m[0] * self.m[3] - self.m[1] * self.m[2]
    }

    /// Propagate through the constant-velocity transition F = [[1, T], [0, 1]]
    /// and add diagonal process noise.
    pub fn predict(&mut self, t: f32, q_angle: f32, q_velocity: f32) {
        let [p00, p10, p01, p11] = self.m;

        self.m = [
            p00 + t * (p10 + p01) + t * t * p11 + q_angle,
            p10 + t * p11,
            p01 + t * p11,
            p11 + q_velocity,
        ];
    }

    /// Measurement update with a diagonal observation matrix H = diag(h_d, h_q)
    /// and isotropic measurement noise `r`.
    ///
    /// Uses the Joseph form so the result stays symmetric positive
    /// semi-definite, then returns the gain for the caller to apply.
    pub fn update(&mut self, h_d: f32, h_q: f32, r: f32) -> Gain2 {
        debug_assert!(r > 0.0);

        let p = self.m;
        let h: Mat2 = [h_d, 0.0, 0.0, h_q];

        // S = H P Hᵀ + R
        let s00 = h_d * h_d * p[0] + r;
        let s10 = h_q * h_d * p[1];
        let s01 = h_d * h_q * p[2];
        let s11 = h_q * h_q * p[3] + r;
        let det = s00 * s11 - s01 * s10;
        debug_assert!(det > 0.0);
        let det_inv = 1.0 / det;
        let s_inv: Mat2 = [s11 * det_inv, -s10 * det_inv, -s01 * det_inv, s00 * det_inv];

        // K = P Hᵀ S⁻¹
        let k = mul(&mul(&p, &transpose(&h)), &s_inv);

        // P = (I - K H) P (I - K H)ᵀ + K R Kᵀ
        let kh = mul(&k, &h);
        let a: Mat2 = [1.0 - kh[0], -kh[1], -kh[2], 1.0 - kh[3]];
        let apa = mul(&mul(&a, &p), &transpose(&a));
        let krk = mul(&k, &transpose(&k));

        let off = 0.5 * ((apa[1] + r * krk[1]) + (apa[2] + r * krk[2]));
        self.m = [
            (apa[0] + r * krk[0]).max(0.0),
            off,
            off,
            (apa[3] + r * krk[3]).max(0.0),
        ];

        Gain2 { k }
    }
}
