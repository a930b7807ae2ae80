//! Training-time augmentation.
//!
//! Two standard CIFAR augmentations applied to items before batching:
//! random horizontal flip and zero-padded random crop. Both operate on the
//! flattened CHW float data and draw from an explicitly passed generator,
//! so a fixed seed reproduces the same augmented stream.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::cifar::CifarItem;

/// Padding added on each side before the random crop
const CROP_PADDING: usize = 4;

/// Augmenter for CIFAR training items
#[derive(Debug, Clone)]
pub struct Augmenter {
    image_size: usize,
}

impl Augmenter {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }

    /// Apply random flip and random crop to one item
    pub fn apply(&self, item: &CifarItem, rng: &mut ChaCha8Rng) -> CifarItem {
        let mut image = item.image.clone();

        if rng.gen_bool(0.5) {
            image = self.flip_horizontal(&image);
        }

        let dx = rng.gen_range(0..=2 * CROP_PADDING);
        let dy = rng.gen_range(0..=2 * CROP_PADDING);
        image = self.padded_crop(&image, dx, dy);

        CifarItem::new(image, item.label)
    }

    /// Augment a whole batch of items
    pub fn apply_batch(&self, items: &[CifarItem], rng: &mut ChaCha8Rng) -> Vec<CifarItem> {
        items.iter().map(|item| self.apply(item, rng)).collect()
    }

    /// Mirror each channel plane left-to-right
    fn flip_horizontal(&self, image: &[f32]) -> Vec<f32> {
        let size = self.image_size;
        let plane = size * size;
        let mut out = vec![0.0f32; image.len()];
        for c in 0..3 {
            for y in 0..size {
                for x in 0..size {
                    out[c * plane + y * size + x] = image[c * plane + y * size + (size - 1 - x)];
                }
            }
        }
        out
    }

    /// Zero-pad by [`CROP_PADDING`] on every side, then crop back to the
    /// original size at offset `(dx, dy)` in the padded frame.
    fn padded_crop(&self, image: &[f32], dx: usize, dy: usize) -> Vec<f32> {
        let size = self.image_size;
        let plane = size * size;
        let mut out = vec![0.0f32; image.len()];

        for c in 0..3 {
            for y in 0..size {
                // Source row in the unpadded image, if inside it
                let src_y = (y + dy) as isize - CROP_PADDING as isize;
                if src_y < 0 || src_y >= size as isize {
                    continue;
                }
                for x in 0..size {
                    let src_x = (x + dx) as isize - CROP_PADDING as isize;
                    if src_x < 0 || src_x >= size as isize {
                        continue;
                    }
                    out[c * plane + y * size + x] =
                        image[c * plane + src_y as usize * size + src_x as usize];
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn ramp_item(size: usize) -> CifarItem {
        let image: Vec<f32> = (0..3 * size * size).map(|i| i as f32).collect();
        CifarItem::new(image, 1)
    }

    #[test]
    fn test_flip_reverses_rows() {
        let augmenter = Augmenter::new(4);
        let item = ramp_item(4);
        let flipped = augmenter.flip_horizontal(&item.image);

        // first row of channel 0: [0,1,2,3] becomes [3,2,1,0]
        assert_eq!(&flipped[0..4], &[3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_centered_crop_is_identity() {
        let augmenter = Augmenter::new(8);
        let item = ramp_item(8);
        // offset equal to the padding lines the crop up with the original
        let cropped = augmenter.padded_crop(&item.image, CROP_PADDING, CROP_PADDING);
        assert_eq!(cropped, item.image);
    }

    #[test]
    fn test_crop_preserves_shape_and_zero_fills() {
        let augmenter = Augmenter::new(8);
        let item = ramp_item(8);
        let cropped = augmenter.padded_crop(&item.image, 0, 0);

        assert_eq!(cropped.len(), item.image.len());
        // top-left corner now comes from the zero padding
        assert_eq!(cropped[0], 0.0);
    }

    #[test]
    fn test_apply_is_reproducible() {
        let augmenter = Augmenter::new(8);
        let item = ramp_item(8);

        let mut rng1 = ChaCha8Rng::seed_from_u64(3);
        let mut rng2 = ChaCha8Rng::seed_from_u64(3);

        let a = augmenter.apply(&item, &mut rng1);
        let b = augmenter.apply(&item, &mut rng2);

        assert_eq!(a.image, b.image);
        assert_eq!(a.label, item.label);
    }
}
