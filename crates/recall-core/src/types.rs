use serde::{Deserialize, Serialize};

/// Face location supplied by the host for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    #[serde(default)]
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face descriptor (512-dimensional for ArcFace).
///
/// Moved into the gallery on enrollment; never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
    /// Model version that produced this descriptor (e.g., "w600k_r50").
    #[serde(default)]
    pub model_version: Option<String>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Cosine similarity in [-1, 1]. Higher = more similar.
    ///
    /// Zero-norm inputs compare as 0.0.
    pub fn similarity(&self, other: &Descriptor) -> f32 {
        let (dot, norm_a, norm_b) = self
            .values
            .iter()
            .zip(other.values.iter())
            .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (a, b)| {
                (dot + a * b, na + a * a, nb + b * b)
            });

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }
}

/// One ranked answer from a gallery search.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub similarity: f32,
    /// Position of the matching descriptor in the gallery.
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_identical() {
        let a = Descriptor::new(vec![0.3, 0.4, 0.0]);
        assert!((a.similarity(&a.clone()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_scale_invariant() {
        let a = Descriptor::new(vec![1.0, 2.0]);
        let b = Descriptor::new(vec![10.0, 20.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_orthogonal_and_opposite() {
        let a = Descriptor::new(vec![1.0, 0.0]);
        assert!(a.similarity(&Descriptor::new(vec![0.0, 1.0])).abs() < 1e-6);
        assert!((a.similarity(&Descriptor::new(vec![-1.0, 0.0])) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_zero_vector() {
        let a = Descriptor::new(vec![0.0, 0.0]);
        let b = Descriptor::new(vec![1.0, 0.0]);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_face_data_landmarks_optional() {
        let face: FaceData =
            serde_json::from_str(r#"{"x":1,"y":2,"width":30,"height":40}"#).unwrap();
        assert!(face.landmarks.is_none());
        assert_eq!(face.confidence, 0.0);

        let face: FaceData = serde_json::from_str(
            r#"{"x":0,"y":0,"width":1,"height":1,"confidence":0.9,
                "landmarks":[[1,2],[3,4],[5,6],[7,8],[9,10]]}"#,
        )
        .unwrap();
        assert_eq!(face.landmarks.unwrap()[4], (9.0, 10.0));
    }
}
