use anyhow::{Context, Result};
use image::imageops::FilterType;

use crate::models::Prediction;

use super::{labels::label_for, runtime::Tensor};

/// Decodes an encoded still, resizes it to the model input and lays it out
/// as `[1, 3, H, W]` with channels scaled to `[0, 1]`.
pub fn frame_to_tensor(bytes: &[u8], input_size: [u32; 2]) -> Result<Tensor> {
    let [width, height] = input_size;
    let decoded = image::load_from_memory(bytes).context("failed to decode frame")?;
    let rgb = decoded
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();

    let (w, h) = (width as usize, height as usize);
    let plane = w * h;
    let mut data = vec![0.0f32; plane * 3];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * w + x as usize;
        for channel in 0..3 {
            data[channel * plane + offset] = pixel[channel] as f32 / 255.0;
        }
    }

    Ok(Tensor {
        shape: [1, 3, h, w],
        data,
    })
}

pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; scores.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Highest `k` scores as `(class, score)`, best first.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

pub fn decode_top1(scores: &[f32], apply_softmax: bool) -> Option<Prediction> {
    let probabilities = if apply_softmax {
        softmax(scores)
    } else {
        scores.to_vec()
    };
    top_k(&probabilities, 1)
        .into_iter()
        .next()
        .map(|(class, probability)| Prediction::new(label_for(class), probability))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::solid_png;

    #[test]
    fn tensor_is_planar_and_normalised() {
        let png = solid_png(8, 6, [255, 0, 51]);
        let tensor = frame_to_tensor(&png, [4, 2]).unwrap();
        assert_eq!(tensor.shape, [1, 3, 2, 4]);
        assert_eq!(tensor.data.len(), 3 * 2 * 4);
        assert!(tensor.data[..8].iter().all(|v| (*v - 1.0).abs() < 1e-6));
        assert!(tensor.data[8..16].iter().all(|v| v.abs() < 1e-6));
        assert!(tensor.data[16..].iter().all(|v| (*v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(frame_to_tensor(b"not an image", [4, 4]).is_err());
    }

    #[test]
    fn softmax_sums_to_one_and_preserves_order() {
        let probs = softmax(&[1.0, 3.0, 2.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(top_k(&probs, 3).iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 2, 0]);
    }

    #[test]
    fn top1_maps_through_label_map() {
        let mut scores = vec![0.0; 27];
        scores[14] = 0.9;
        assert_eq!(decode_top1(&scores, false).unwrap().label, "NOTHING");
        scores[15] = 0.95;
        let prediction = decode_top1(&scores, false).unwrap();
        assert_eq!(prediction.label, "O");
        assert!((prediction.probability - 0.95).abs() < 1e-6);
        assert!(decode_top1(&[], true).is_none());
    }

    #[test]
    fn out_of_range_class_is_unknown() {
        let mut scores = vec![0.0; 30];
        scores[29] = 5.0;
        assert_eq!(decode_top1(&scores, true).unwrap().label, "Unknown");
    }
}
