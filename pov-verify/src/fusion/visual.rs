//! Visual Similarity Fuser
//!
//! Combines three independent similarity signals over the submitted and
//! reference photos:
//! 1. Fingerprint similarity (perceptual hash distance → 0-100%)
//! 2. Structural score (SSIM on size-aligned grayscale images)
//! 3. Keypoint match count (cross-checked binary descriptor matches)
//!
//! The visual gate passes when the composition matches strongly on its own,
//! or when moderate structure is backed by enough feature evidence. Each
//! signal is isolated: a failure zeroes that signal and nothing else.

use std::sync::Arc;

use image::imageops::FilterType;
use image::DynamicImage;
use pov_common::config::PolicySettings;
use tracing::{debug, warn};

use crate::types::{
    BinaryDescriptor, FeatureDetector, Fingerprinter, ImageHandle, ImageLoader, SignalError,
    StructuralSimilarity, VisualCheckResult,
};

/// Reason used when either photo cannot be decoded
pub const LOAD_FAILURE_REASON: &str = "failed to load images";

/// Raw sub-signal values before fusion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubSignals {
    /// 0-100
    pub fingerprint_similarity: f64,
    /// Metric-native range, typically [0, 1]
    pub structural_score: f64,
    pub keypoint_matches: u32,
}

/// A mutual best match between two descriptor sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorMatch {
    pub query: usize,
    pub train: usize,
    pub distance: u32,
}

// ============================================================================
// Decision arithmetic
// ============================================================================

/// Convert a fingerprint bit difference into a 0-100 similarity
pub fn fingerprint_similarity(diff: u32, max_diff: u32) -> f64 {
    if max_diff == 0 {
        return 0.0;
    }
    ((max_diff as f64 - diff as f64) / max_diff as f64 * 100.0).max(0.0)
}

/// Disjunctive pass rule
pub fn visual_passed(policy: &PolicySettings, signals: &SubSignals) -> bool {
    signals.fingerprint_similarity >= policy.min_fingerprint_similarity
        || (signals.structural_score >= policy.min_structural_score
            && signals.keypoint_matches >= policy.min_keypoint_matches)
}

/// Weighted visual score, clamped to 0-100
pub fn fused_score(policy: &PolicySettings, signals: &SubSignals) -> f64 {
    let saturation = policy.keypoint_saturation.max(1) as f64;
    let keypoint_term = (signals.keypoint_matches as f64 / saturation * 100.0).min(100.0);

    let score = signals.fingerprint_similarity * policy.fingerprint_weight
        + signals.structural_score * 100.0 * policy.structural_weight
        + keypoint_term * policy.keypoint_weight;

    score.clamp(0.0, 100.0)
}

/// Explain a failed visual gate
///
/// A failure always means the fingerprint fell short, so that is named first;
/// the first shortfall of the structure-plus-features alternative follows
/// (structure before features).
pub fn rejection_reason(policy: &PolicySettings, signals: &SubSignals) -> String {
    let mut parts = Vec::new();

    if signals.fingerprint_similarity < policy.min_fingerprint_similarity {
        parts.push(format!(
            "angle/composition mismatch (similarity: {:.1}%)",
            signals.fingerprint_similarity
        ));
    }

    if signals.structural_score < policy.min_structural_score {
        parts.push(format!(
            "structural similarity too low ({:.2})",
            signals.structural_score
        ));
    } else if signals.keypoint_matches < policy.min_keypoint_matches {
        parts.push(format!(
            "insufficient matching features ({} found)",
            signals.keypoint_matches
        ));
    }

    parts.join("; ")
}

/// Apply the pass rule and score to a set of sub-signals
pub fn decide(policy: &PolicySettings, signals: SubSignals) -> VisualCheckResult {
    let passed = visual_passed(policy, &signals);

    VisualCheckResult {
        passed,
        reason: (!passed).then(|| rejection_reason(policy, &signals)),
        score: fused_score(policy, &signals),
        fingerprint_similarity: signals.fingerprint_similarity,
        structural_score: signals.structural_score,
        keypoint_matches: signals.keypoint_matches,
    }
}

// ============================================================================
// Matching
// ============================================================================

fn nearest(descriptor: &BinaryDescriptor, candidates: &[BinaryDescriptor]) -> Option<(usize, u32)> {
    candidates
        .iter()
        .enumerate()
        .map(|(idx, other)| (idx, descriptor.hamming(other)))
        .min_by_key(|&(idx, distance)| (distance, idx))
}

/// Brute-force Hamming matching with cross-check
///
/// A pair is kept only when each descriptor is the other's nearest neighbour.
pub fn cross_check_matches(
    query: &[BinaryDescriptor],
    train: &[BinaryDescriptor],
) -> Vec<DescriptorMatch> {
    let reverse: Vec<Option<usize>> = train
        .iter()
        .map(|d| nearest(d, query).map(|(idx, _)| idx))
        .collect();

    query
        .iter()
        .enumerate()
        .filter_map(|(q, descriptor)| {
            let (t, distance) = nearest(descriptor, train)?;
            (reverse[t] == Some(q)).then_some(DescriptorMatch {
                query: q,
                train: t,
                distance,
            })
        })
        .collect()
}

// ============================================================================
// Fuser
// ============================================================================

pub struct VisualFuser {
    loader: Arc<dyn ImageLoader>,
    fingerprinter: Arc<dyn Fingerprinter>,
    structural: Arc<dyn StructuralSimilarity>,
    detector: Arc<dyn FeatureDetector>,
    policy: PolicySettings,
}

impl VisualFuser {
    pub fn new(
        loader: Arc<dyn ImageLoader>,
        fingerprinter: Arc<dyn Fingerprinter>,
        structural: Arc<dyn StructuralSimilarity>,
        detector: Arc<dyn FeatureDetector>,
        policy: PolicySettings,
    ) -> Self {
        Self {
            loader,
            fingerprinter,
            structural,
            detector,
            policy,
        }
    }

    /// Compare the submitted photo against the reference photo
    pub fn fuse(&self, submitted: &ImageHandle, reference: &ImageHandle) -> VisualCheckResult {
        let loaded = self
            .loader
            .load(submitted)
            .and_then(|s| self.loader.load(reference).map(|r| (s, r)));
        let (submitted_img, reference_img) = match loaded {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Image load failed, skipping visual signals");
                return VisualCheckResult::rejected(LOAD_FAILURE_REASON);
            }
        };

        let signals = SubSignals {
            fingerprint_similarity: isolate(
                "fingerprint",
                self.fingerprint_similarity(&submitted_img, &reference_img),
                0.0,
            ),
            structural_score: isolate(
                "structural",
                self.structural_score(&submitted_img, &reference_img),
                0.0,
            ),
            keypoint_matches: isolate(
                "keypoints",
                self.keypoint_matches(&submitted_img, &reference_img),
                0,
            ),
        };

        debug!(
            fingerprint = signals.fingerprint_similarity,
            structural = signals.structural_score,
            keypoints = signals.keypoint_matches,
            "Visual sub-signals computed"
        );

        decide(&self.policy, signals)
    }

    fn fingerprint_similarity(
        &self,
        first: &DynamicImage,
        second: &DynamicImage,
    ) -> Result<f64, SignalError> {
        let a = self.fingerprinter.fingerprint(first)?;
        let b = self.fingerprinter.fingerprint(second)?;
        let diff = a.distance(&b)?;
        Ok(fingerprint_similarity(diff, a.max_distance()))
    }

    /// Resize both images to the pairwise minimum width and height, then
    /// compare their intensity channels
    fn structural_score(
        &self,
        first: &DynamicImage,
        second: &DynamicImage,
    ) -> Result<f64, SignalError> {
        let width = first.width().min(second.width());
        let height = first.height().min(second.height());
        if width == 0 || height == 0 {
            return Err(SignalError::ImageTooSmall {
                width,
                height,
                min: 1,
            });
        }

        let a = first
            .resize_exact(width, height, FilterType::Triangle)
            .to_luma8();
        let b = second
            .resize_exact(width, height, FilterType::Triangle)
            .to_luma8();
        self.structural.compare(&a, &b)
    }

    fn keypoint_matches(
        &self,
        first: &DynamicImage,
        second: &DynamicImage,
    ) -> Result<u32, SignalError> {
        let max_features = self.policy.max_features;
        let a = self.detector.detect(&first.to_luma8(), max_features)?;
        let b = self.detector.detect(&second.to_luma8(), max_features)?;
        if a.is_empty() || b.is_empty() {
            return Ok(0);
        }

        let good = cross_check_matches(&a, &b)
            .into_iter()
            .filter(|m| m.distance < self.policy.max_match_distance)
            .count();
        Ok(good as u32)
    }
}

/// Degrade a failed sub-signal to its zero value
fn isolate<T>(signal: &'static str, result: Result<T, SignalError>, zero: T) -> T {
    result.unwrap_or_else(|e| {
        warn!(signal, error = %e, "Visual sub-signal failed, using zero value");
        zero
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fingerprint, ImageLoadError};
    use image::{GrayImage, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn signals(fp: f64, ssim: f64, kp: u32) -> SubSignals {
        SubSignals {
            fingerprint_similarity: fp,
            structural_score: ssim,
            keypoint_matches: kp,
        }
    }

    // ------------------------------------------------------------------
    // Decision arithmetic
    // ------------------------------------------------------------------

    #[test]
    fn test_fingerprint_similarity_conversion() {
        assert_eq!(fingerprint_similarity(0, 64), 100.0);
        assert_eq!(fingerprint_similarity(32, 64), 50.0);
        assert_eq!(fingerprint_similarity(64, 64), 0.0);
        assert_eq!(fingerprint_similarity(80, 64), 0.0);
    }

    #[test]
    fn test_strong_fingerprint_passes_alone() {
        let result = decide(&PolicySettings::default(), signals(90.0, 0.1, 0));
        assert!(result.passed);
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_structure_plus_features_passes() {
        let result = decide(&PolicySettings::default(), signals(40.0, 0.6, 10));
        assert!(result.passed);
    }

    #[test]
    fn test_both_disjuncts_fail_names_structure() {
        let result = decide(&PolicySettings::default(), signals(50.0, 0.5, 5));
        assert!(!result.passed);
        let reason = result.reason.unwrap();
        assert!(reason.starts_with("angle/composition mismatch"));
        assert!(reason.contains("structural similarity too low (0.50)"));
        assert!(!reason.contains("insufficient matching features"));
    }

    #[test]
    fn test_feature_shortfall_named_when_structure_ok() {
        let result = decide(&PolicySettings::default(), signals(50.0, 0.8, 5));
        assert!(!result.passed);
        let reason = result.reason.unwrap();
        assert!(reason.contains("insufficient matching features (5 found)"));
        assert!(!reason.contains("structural"));
    }

    #[test]
    fn test_fused_score_weights() {
        let policy = PolicySettings::default();
        assert!((fused_score(&policy, &signals(100.0, 1.0, 50)) - 100.0).abs() < 1e-9);
        // 80*0.3 + 0.5*100*0.4 + (25/50*100)*0.3 = 24 + 20 + 15
        assert!((fused_score(&policy, &signals(80.0, 0.5, 25)) - 59.0).abs() < 1e-9);
        // Keypoint term saturates at 100
        assert!((fused_score(&policy, &signals(0.0, 0.0, 500)) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_fused_score_clamped_for_negative_structure() {
        let policy = PolicySettings::default();
        assert_eq!(fused_score(&policy, &signals(0.0, -0.8, 0)), 0.0);
    }

    // ------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------

    fn desc(word: u64) -> BinaryDescriptor {
        BinaryDescriptor([word, 0, 0, 0])
    }

    #[test]
    fn test_cross_check_requires_mutual_best() {
        let query = vec![desc(0b0000), desc(0b0001)];
        // Both query descriptors are closest to train[0]; only query[0] is train[0]'s best
        let train = vec![desc(0b0000), desc(u64::MAX)];

        let matches = cross_check_matches(&query, &train);
        assert_eq!(
            matches,
            vec![DescriptorMatch {
                query: 0,
                train: 0,
                distance: 0
            }]
        );
    }

    #[test]
    fn test_cross_check_empty_inputs() {
        assert!(cross_check_matches(&[], &[desc(1)]).is_empty());
        assert!(cross_check_matches(&[desc(1)], &[]).is_empty());
    }

    // ------------------------------------------------------------------
    // Fuser with stub collaborators
    // ------------------------------------------------------------------

    struct StubLoader {
        fail_on: Option<&'static str>,
        calls: Arc<AtomicUsize>,
        sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl StubLoader {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                fail_on,
                calls: Arc::new(AtomicUsize::new(0)),
                sizes: Mutex::new(vec![(64, 48), (40, 80)]),
            }
        }
    }

    impl ImageLoader for StubLoader {
        fn load(&self, image: &ImageHandle) -> Result<DynamicImage, ImageLoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(image.path().to_str().unwrap_or_default()) == self.fail_on {
                return Err(ImageLoadError {
                    path: image.path().to_path_buf(),
                    message: "corrupt".to_string(),
                });
            }
            let mut sizes = self.sizes.lock().unwrap();
            let (w, h) = if sizes.is_empty() { (32, 32) } else { sizes.remove(0) };
            Ok(DynamicImage::ImageRgb8(RgbImage::new(w, h)))
        }
    }

    struct StubFingerprinter {
        hashes: Mutex<Vec<u64>>,
        calls: Arc<AtomicUsize>,
    }

    impl Fingerprinter for StubFingerprinter {
        fn fingerprint(&self, _image: &DynamicImage) -> Result<Fingerprint, SignalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut hashes = self.hashes.lock().unwrap();
            Ok(Fingerprint::from(hashes.remove(0)))
        }
    }

    struct FailingFingerprinter;

    impl Fingerprinter for FailingFingerprinter {
        fn fingerprint(&self, _image: &DynamicImage) -> Result<Fingerprint, SignalError> {
            Err(SignalError::Computation("hash exploded".to_string()))
        }
    }

    /// Records the dimensions it was handed
    struct StubStructural {
        score: f64,
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl StructuralSimilarity for StubStructural {
        fn compare(&self, first: &GrayImage, second: &GrayImage) -> Result<f64, SignalError> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(first.dimensions());
            seen.push(second.dimensions());
            Ok(self.score)
        }
    }

    struct FailingStructural;

    impl StructuralSimilarity for FailingStructural {
        fn compare(&self, _first: &GrayImage, _second: &GrayImage) -> Result<f64, SignalError> {
            Err(SignalError::Computation("window sums diverged".to_string()))
        }
    }

    struct FailingDetector;

    impl FeatureDetector for FailingDetector {
        fn detect(
            &self,
            _image: &GrayImage,
            _max_features: usize,
        ) -> Result<Vec<BinaryDescriptor>, SignalError> {
            Err(SignalError::Computation("corner scan failed".to_string()))
        }
    }

    struct StubDetector {
        descriptors: Vec<BinaryDescriptor>,
    }

    impl FeatureDetector for StubDetector {
        fn detect(
            &self,
            _image: &GrayImage,
            max_features: usize,
        ) -> Result<Vec<BinaryDescriptor>, SignalError> {
            Ok(self.descriptors.iter().copied().take(max_features).collect())
        }
    }

    fn distinct_descriptors(n: usize) -> Vec<BinaryDescriptor> {
        // All distinct, so each one only matches itself
        (0..n)
            .map(|i| {
                let mut words = [0u64; 4];
                words[i % 4] = if i / 4 % 2 == 0 { u64::MAX } else { 0xFFFF_FFFF };
                words[(i + 1) % 4] = i as u64;
                BinaryDescriptor(words)
            })
            .collect()
    }

    #[test]
    fn test_fuse_identical_signals_pass() {
        let fp_calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let fuser = VisualFuser::new(
            Arc::new(StubLoader::new(None)),
            Arc::new(StubFingerprinter {
                hashes: Mutex::new(vec![0xF0F0, 0xF0F0]),
                calls: fp_calls.clone(),
            }),
            Arc::new(StubStructural {
                score: 0.9,
                seen: seen.clone(),
            }),
            Arc::new(StubDetector {
                descriptors: vec![desc(1), desc(1 << 40)],
            }),
            PolicySettings::default(),
        );

        let result = fuser.fuse(&ImageHandle::new("a.jpg"), &ImageHandle::new("b.jpg"));

        assert!(result.passed);
        assert_eq!(result.fingerprint_similarity, 100.0);
        assert_eq!(result.structural_score, 0.9);
        assert_eq!(result.keypoint_matches, 2);
        assert_eq!(fp_calls.load(Ordering::SeqCst), 2);
        // 64x48 and 40x80 are aligned to 40x48
        assert_eq!(*seen.lock().unwrap(), vec![(40, 48), (40, 48)]);
    }

    #[test]
    fn test_fuse_load_failure_short_circuits() {
        let fp_calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let fuser = VisualFuser::new(
            Arc::new(StubLoader::new(Some("b.jpg"))),
            Arc::new(StubFingerprinter {
                hashes: Mutex::new(vec![0, 0]),
                calls: fp_calls.clone(),
            }),
            Arc::new(StubStructural {
                score: 1.0,
                seen: seen.clone(),
            }),
            Arc::new(StubDetector {
                descriptors: vec![],
            }),
            PolicySettings::default(),
        );

        let result = fuser.fuse(&ImageHandle::new("a.jpg"), &ImageHandle::new("b.jpg"));

        assert_eq!(result, VisualCheckResult::rejected(LOAD_FAILURE_REASON));
        assert_eq!(fp_calls.load(Ordering::SeqCst), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fuse_isolates_failed_sub_signal() {
        let fuser = VisualFuser::new(
            Arc::new(StubLoader::new(None)),
            Arc::new(FailingFingerprinter),
            Arc::new(StubStructural {
                score: 0.75,
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            Arc::new(StubDetector {
                descriptors: distinct_descriptors(12),
            }),
            PolicySettings::default(),
        );

        let result = fuser.fuse(&ImageHandle::new("a.jpg"), &ImageHandle::new("b.jpg"));

        assert_eq!(result.fingerprint_similarity, 0.0);
        assert_eq!(result.structural_score, 0.75);
        assert_eq!(result.keypoint_matches, 12);
        // Second disjunct carries it
        assert!(result.passed);
    }

    fn matching_fingerprinter() -> Arc<StubFingerprinter> {
        Arc::new(StubFingerprinter {
            hashes: Mutex::new(vec![0xF0F0, 0xF0F0]),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    #[test]
    fn test_fuse_isolates_failed_structural_signal() {
        let fuser = VisualFuser::new(
            Arc::new(StubLoader::new(None)),
            matching_fingerprinter(),
            Arc::new(FailingStructural),
            Arc::new(StubDetector {
                descriptors: distinct_descriptors(12),
            }),
            PolicySettings::default(),
        );

        let result = fuser.fuse(&ImageHandle::new("a.jpg"), &ImageHandle::new("b.jpg"));

        assert_eq!(result.structural_score, 0.0);
        assert_eq!(result.fingerprint_similarity, 100.0);
        assert_eq!(result.keypoint_matches, 12);
        assert!(result.passed);
    }

    #[test]
    fn test_fuse_isolates_failed_keypoint_signal() {
        let fuser = VisualFuser::new(
            Arc::new(StubLoader::new(None)),
            matching_fingerprinter(),
            Arc::new(StubStructural {
                score: 0.9,
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            Arc::new(FailingDetector),
            PolicySettings::default(),
        );

        let result = fuser.fuse(&ImageHandle::new("a.jpg"), &ImageHandle::new("b.jpg"));

        assert_eq!(result.keypoint_matches, 0);
        assert_eq!(result.fingerprint_similarity, 100.0);
        assert_eq!(result.structural_score, 0.9);
        assert!(result.passed);
    }

    #[test]
    fn test_fuse_missing_descriptors_yield_zero_matches() {
        let fuser = VisualFuser::new(
            Arc::new(StubLoader::new(None)),
            Arc::new(StubFingerprinter {
                hashes: Mutex::new(vec![0, u64::MAX]),
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            Arc::new(StubStructural {
                score: 0.7,
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            Arc::new(StubDetector {
                descriptors: vec![],
            }),
            PolicySettings::default(),
        );

        let result = fuser.fuse(&ImageHandle::new("a.jpg"), &ImageHandle::new("b.jpg"));
        assert_eq!(result.keypoint_matches, 0);
        assert_eq!(result.fingerprint_similarity, 0.0);
        assert!(!result.passed);
        assert!(result
            .reason
            .unwrap()
            .contains("insufficient matching features (0 found)"));
    }
}
