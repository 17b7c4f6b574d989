// ============================================================
// Layer 5 — Fixed Filter Bank
// ============================================================
// 62 non-trainable 5×5 kernels that turn an image into noise
// residuals before the first learned convolution:
//
//   30 SRM high-pass kernels
//       8  first order      centre −1, one neighbour +1     / 1
//       4  second order     1, −2, 1 along a direction       / 2
//       8  third order      −1, 3, −3, 1 along a direction   / 3
//       4  EDGE 3×3         half of KB: up, right, down, left / 4
//       4  EDGE 5×5         half of KV: up, right, down, left / 12
//       1  SQUARE 3×3 (KB)                                   / 4
//       1  SQUARE 5×5 (KV)                                   / 12
//   32 Gabor kernels
//       θ ∈ {0, π/8, …, 7π/8} × σ ∈ {0.5, 1} × ψ ∈ {0, π/2}
//
// 3×3 kernels are zero-padded to 5×5 around the centre.
//
// Reference: Fridrich & Kodovský (2012) Rich Models for Steganalysis

use std::f64::consts::PI;

pub const KERNEL_SIZE:   usize = 5;
pub const SRM_FILTERS:   usize = 30;
pub const GABOR_FILTERS: usize = 32;
pub const FILTER_COUNT:  usize = SRM_FILTERS + GABOR_FILTERS;

pub type Kernel = [[f32; KERNEL_SIZE]; KERNEL_SIZE];

const C: usize = KERNEL_SIZE / 2;

/// Neighbour offsets in row-major order around the centre.
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    ( 0, -1),          ( 0, 1),
    ( 1, -1), ( 1, 0), ( 1, 1),
];

const SQUARE_3X3: [[f32; 3]; 3] = [
    [-1.0,  2.0, -1.0],
    [ 2.0, -4.0,  2.0],
    [-1.0,  2.0, -1.0],
];

const SQUARE_5X5: Kernel = [
    [-1.0,  2.0,  -2.0,  2.0, -1.0],
    [ 2.0, -6.0,   8.0, -6.0,  2.0],
    [-2.0,  8.0, -12.0,  8.0, -2.0],
    [ 2.0, -6.0,   8.0, -6.0,  2.0],
    [-1.0,  2.0,  -2.0,  2.0, -1.0],
];

#[derive(Debug, Clone)]
pub struct FilterBank {
    kernels: Vec<Kernel>,
}

impl FilterBank {
    pub fn new() -> Self {
        let mut kernels = srm_kernels();
        kernels.extend(gabor_kernels());
        Self { kernels }
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Row-major weights laid out as `[filters, 1, 5, 5]`.
    pub fn weights(&self) -> Vec<f32> {
        self.kernels
            .iter()
            .flat_map(|k| k.iter().flat_map(|row| row.iter().copied()))
            .collect()
    }
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new()
    }
}

// ─── SRM ──────────────────────────────────────────────────────────────────────

fn srm_kernels() -> Vec<Kernel> {
    let mut out = Vec::with_capacity(SRM_FILTERS);

    for &d in &NEIGHBOURS {
        out.push(directional(&[(0, -1.0), (1, 1.0)], d));
    }
    for &d in &NEIGHBOURS[..4] {
        out.push(scaled(directional(&[(-1, 1.0), (0, -2.0), (1, 1.0)], d), 2.0));
    }
    for &d in &NEIGHBOURS {
        out.push(scaled(directional(&[(-1, 1.0), (0, -3.0), (1, 3.0), (2, -1.0)], d), 3.0));
    }

    let mut edge3 = pad3(&SQUARE_3X3);
    clear_rows_below(&mut edge3, C);
    out.extend(rotations(edge3).into_iter().map(|k| scaled(k, 4.0)));

    let mut edge5 = SQUARE_5X5;
    clear_rows_below(&mut edge5, C);
    out.extend(rotations(edge5).into_iter().map(|k| scaled(k, 12.0)));

    out.push(scaled(pad3(&SQUARE_3X3), 4.0));
    out.push(scaled(SQUARE_5X5, 12.0));

    debug_assert_eq!(out.len(), SRM_FILTERS);
    out
}

/// Place `(step, weight)` taps at `centre + step·d`.
fn directional(taps: &[(isize, f32)], (dy, dx): (isize, isize)) -> Kernel {
    let mut k = [[0.0; KERNEL_SIZE]; KERNEL_SIZE];
    for &(step, weight) in taps {
        let y = (C as isize + step * dy) as usize;
        let x = (C as isize + step * dx) as usize;
        k[y][x] = weight;
    }
    k
}

fn pad3(small: &[[f32; 3]; 3]) -> Kernel {
    let mut k = [[0.0; KERNEL_SIZE]; KERNEL_SIZE];
    for (y, row) in small.iter().enumerate() {
        for (x, &v) in row.iter().enumerate() {
            k[y + 1][x + 1] = v;
        }
    }
    k
}

fn clear_rows_below(k: &mut Kernel, last_kept: usize) {
    for row in k.iter_mut().skip(last_kept + 1) {
        *row = [0.0; KERNEL_SIZE];
    }
}

/// The kernel and its three successive clockwise quarter turns.
/// An upper-half EDGE kernel yields up, right, down, left.
fn rotations(k: Kernel) -> [Kernel; 4] {
    let r1 = rot90_cw(&k);
    let r2 = rot90_cw(&r1);
    let r3 = rot90_cw(&r2);
    [k, r1, r2, r3]
}

fn rot90_cw(k: &Kernel) -> Kernel {
    let mut out = [[0.0; KERNEL_SIZE]; KERNEL_SIZE];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = k[KERNEL_SIZE - 1 - c][r];
        }
    }
    out
}

fn scaled(mut k: Kernel, q: f32) -> Kernel {
    k.iter_mut().flatten().for_each(|v| *v /= q);
    k
}

// ─── Gabor ────────────────────────────────────────────────────────────────────

fn gabor_kernels() -> Vec<Kernel> {
    let sigmas = [0.5, 1.0];
    let phases = [0.0, PI / 2.0];

    let mut out = Vec::with_capacity(GABOR_FILTERS);
    for step in 0..8 {
        let theta = step as f64 * PI / 8.0;
        for &sigma in &sigmas {
            for &psi in &phases {
                out.push(gabor(sigma, theta, sigma / 0.56, 0.5, psi));
            }
        }
    }
    out
}

/// Sampled exactly like OpenCV's `getGaborKernel`, including the
/// `(ymax - y, xmax - x)` destination index.
pub fn gabor(sigma: f64, theta: f64, lambda: f64, gamma: f64, psi: f64) -> Kernel {
    let half = C as isize;
    let sigma_x = sigma;
    let sigma_y = sigma / gamma;
    let ex = -0.5 / (sigma_x * sigma_x);
    let ey = -0.5 / (sigma_y * sigma_y);
    let cscale = 2.0 * PI / lambda;
    let (s, c) = theta.sin_cos();

    let mut k = [[0.0; KERNEL_SIZE]; KERNEL_SIZE];
    for y in -half..=half {
        for x in -half..=half {
            let (xf, yf) = (x as f64, y as f64);
            let xr = xf * c + yf * s;
            let yr = -xf * s + yf * c;
            let v = (ex * xr * xr + ey * yr * yr).exp() * (cscale * xr + psi).cos();
            k[(half - y) as usize][(half - x) as usize] = v as f32;
        }
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(k: &Kernel) -> f32 {
        k.iter().flatten().sum()
    }

    #[test]
    fn test_bank_has_sixty_two_kernels() {
        let bank = FilterBank::new();
        assert_eq!(bank.len(), FILTER_COUNT);
        assert_eq!(bank.weights().len(), FILTER_COUNT * KERNEL_SIZE * KERNEL_SIZE);
    }

    #[test]
    fn test_srm_kernels_are_high_pass() {
        for (i, k) in srm_kernels().iter().enumerate() {
            assert!(sum(k).abs() < 1e-6, "kernel {i} sums to {}", sum(k));
        }
    }

    #[test]
    fn test_first_order_kernel_layout() {
        let k = &srm_kernels()[0];
        assert_eq!(k[C][C], -1.0);
        assert_eq!(k[C - 1][C - 1], 1.0);
        assert_eq!(k.iter().flatten().filter(|v| **v != 0.0).count(), 2);
    }

    #[test]
    fn test_third_order_kernel_is_normalised() {
        // direction (-1,-1): -1, 3, -3, 1 along the main diagonal, / 3
        let k = &srm_kernels()[12];
        assert_eq!(k[0][0], -1.0 / 3.0);
        assert_eq!(k[1][1], 1.0);
        assert_eq!(k[2][2], -1.0);
        assert_eq!(k[3][3], 1.0 / 3.0);
    }

    #[test]
    fn test_square_kernels_are_last() {
        let srm = srm_kernels();
        assert_eq!(srm[28][C][C], -1.0);
        assert_eq!(srm[29][C][C], -1.0);
        assert_eq!(srm[29][0][0], -1.0 / 12.0);
    }

    #[test]
    fn test_edge_kernels_rotate() {
        let srm = srm_kernels();
        // First EDGE3x3 keeps the upper half, the third keeps the lower half
        assert_eq!(srm[20][1][1], -0.25);
        assert_eq!(srm[20][3][1], 0.0);
        assert_eq!(srm[22][3][1], -0.25);
        assert_eq!(srm[22][1][1], 0.0);
    }

    #[test]
    fn test_edge_kernels_turn_clockwise() {
        let srm = srm_kernels();
        // up, right, down, left
        assert_eq!(srm[21][1][3], -0.25);
        assert_eq!(srm[21][1][1], 0.0);
        assert_eq!(srm[23][1][1], -0.25);
        assert_eq!(srm[23][1][3], 0.0);

        // EDGE 5×5 keeps its centre column in every orientation
        assert_eq!(srm[25][0][4], -1.0 / 12.0);
        assert_eq!(srm[25][0][0], 0.0);
    }

    #[test]
    fn test_gabor_centre_is_cos_psi() {
        let even = gabor(1.0, PI / 8.0, 1.0 / 0.56, 0.5, 0.0);
        let odd  = gabor(1.0, PI / 8.0, 1.0 / 0.56, 0.5, PI / 2.0);
        assert!((even[C][C] - 1.0).abs() < 1e-6);
        assert!(odd[C][C].abs() < 1e-6);
    }

    #[test]
    fn test_gabor_at_zero_angle_is_symmetric_left_right_for_even_phase() {
        let k = gabor(1.0, 0.0, 1.0 / 0.56, 0.5, 0.0);
        for row in &k {
            assert!((row[0] - row[4]).abs() < 1e-6);
            assert!((row[1] - row[3]).abs() < 1e-6);
        }
    }
}
