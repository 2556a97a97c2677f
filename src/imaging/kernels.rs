//! Convolution kernels and the single routine that applies them.
//!
//! Weights, scale and offset follow the classic PIL `ImageFilter` set, so a
//! filtered image looks the way users of that family of tools expect. The
//! output channel value is `round(sum(weight * pixel) / scale + offset)`,
//! clamped to `0..=255`.
//!
//! Only the colour channels are convolved. Alpha is carried through as-is,
//! since an offset kernel (contour, emboss) would otherwise turn opaque
//! regions translucent. Pixels closer to the edge than the kernel radius are
//! copied unchanged.

use image::RgbaImage;

/// A square convolution kernel.
#[derive(Debug, PartialEq, Eq)]
pub struct Kernel {
    /// Side length (3 or 5).
    pub size: usize,
    /// Row-major weights, `size * size` entries.
    pub weights: &'static [i32],
    pub scale: i32,
    pub offset: i32,
}

impl Kernel {
    fn radius(&self) -> u32 {
        (self.size / 2) as u32
    }

    fn finish(&self, acc: i32) -> u8 {
        let v = f64::from(acc) / f64::from(self.scale) + f64::from(self.offset);
        v.round().clamp(0.0, 255.0) as u8
    }
}

#[rustfmt::skip]
pub static BLUR: Kernel = Kernel {
    size: 5,
    weights: &[
        1, 1, 1, 1, 1,
        1, 0, 0, 0, 1,
        1, 0, 0, 0, 1,
        1, 0, 0, 0, 1,
        1, 1, 1, 1, 1,
    ],
    scale: 16,
    offset: 0,
};

#[rustfmt::skip]
pub static CONTOUR: Kernel = Kernel {
    size: 3,
    weights: &[
        -1, -1, -1,
        -1,  8, -1,
        -1, -1, -1,
    ],
    scale: 1,
    offset: 255,
};

#[rustfmt::skip]
pub static DETAIL: Kernel = Kernel {
    size: 3,
    weights: &[
         0, -1,  0,
        -1, 10, -1,
         0, -1,  0,
    ],
    scale: 6,
    offset: 0,
};

#[rustfmt::skip]
pub static EDGE_ENHANCE: Kernel = Kernel {
    size: 3,
    weights: &[
        -1, -1, -1,
        -1, 10, -1,
        -1, -1, -1,
    ],
    scale: 2,
    offset: 0,
};

#[rustfmt::skip]
pub static EMBOSS: Kernel = Kernel {
    size: 3,
    weights: &[
        -1, 0, 0,
         0, 1, 0,
         0, 0, 0,
    ],
    scale: 1,
    offset: 128,
};

#[rustfmt::skip]
pub static SHARPEN: Kernel = Kernel {
    size: 3,
    weights: &[
        -2, -2, -2,
        -2, 32, -2,
        -2, -2, -2,
    ],
    scale: 16,
    offset: 0,
};

#[rustfmt::skip]
pub static SMOOTH: Kernel = Kernel {
    size: 3,
    weights: &[
        1, 1, 1,
        1, 5, 1,
        1, 1, 1,
    ],
    scale: 13,
    offset: 0,
};

/// Apply `kernel` to the RGB channels of `src`.
pub fn convolve(src: &RgbaImage, kernel: &Kernel) -> RgbaImage {
    let (width, height) = src.dimensions();
    let r = kernel.radius();
    let mut out = src.clone();

    if width <= 2 * r || height <= 2 * r {
        return out;
    }

    for y in r..height - r {
        for x in r..width - r {
            let mut acc = [0i32; 3];
            for ky in 0..kernel.size {
                for kx in 0..kernel.size {
                    let weight = kernel.weights[ky * kernel.size + kx];
                    if weight == 0 {
                        continue;
                    }
                    let p = src.get_pixel(x + kx as u32 - r, y + ky as u32 - r);
                    for (c, sum) in acc.iter_mut().enumerate() {
                        *sum += weight * i32::from(p[c]);
                    }
                }
            }
            let pixel = out.get_pixel_mut(x, y);
            for (c, sum) in acc.into_iter().enumerate() {
                pixel[c] = kernel.finish(sum);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn uniform(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    #[test]
    fn normalized_kernels_keep_flat_regions_flat() {
        let src = uniform(8, 8, 100);
        for kernel in [&BLUR, &DETAIL, &EDGE_ENHANCE, &SHARPEN, &SMOOTH] {
            let out = convolve(&src, kernel);
            assert_eq!(out, src);
        }
    }

    #[test]
    fn contour_turns_flat_regions_white() {
        let out = convolve(&uniform(6, 6, 40), &CONTOUR);
        assert_eq!(out.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn emboss_turns_flat_regions_mid_grey() {
        let out = convolve(&uniform(6, 6, 200), &EMBOSS);
        assert_eq!(out.get_pixel(3, 3), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn border_pixels_are_copied() {
        let out = convolve(&uniform(6, 6, 40), &CONTOUR);
        assert_eq!(out.get_pixel(0, 0), &Rgba([40, 40, 40, 255]));
        assert_eq!(out.get_pixel(5, 3), &Rgba([40, 40, 40, 255]));
    }

    #[test]
    fn image_smaller_than_kernel_is_unchanged() {
        let src = RgbaImage::from_fn(4, 4, |x, y| Rgba([(x * 60) as u8, (y * 60) as u8, 7, 255]));
        assert_eq!(convolve(&src, &BLUR), src);
    }

    #[test]
    fn alpha_is_preserved() {
        let src = RgbaImage::from_pixel(5, 5, Rgba([10, 20, 30, 77]));
        let out = convolve(&src, &EMBOSS);
        assert!(out.pixels().all(|p| p[3] == 77));
    }

    #[test]
    fn sharpen_amplifies_a_bright_dot() {
        let mut src = uniform(5, 5, 100);
        src.put_pixel(2, 2, Rgba([120, 120, 120, 255]));
        let out = convolve(&src, &SHARPEN);
        // (32*120 - 16*100) / 16 = 140
        assert_eq!(out.get_pixel(2, 2)[0], 140);
        // neighbour: (32*100 - 2*120 - 14*100) / 16 = 97.5 -> 98
        assert_eq!(out.get_pixel(1, 1)[0], 98);
    }

    #[test]
    fn results_clamp_to_channel_range() {
        let mut src = uniform(3, 3, 0);
        src.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let out = convolve(&src, &EDGE_ENHANCE);
        assert_eq!(out.get_pixel(1, 1)[0], 255);
    }
}
