//! Capability negotiation.
//!
//! Pure functions mapping a requested quality onto a device's reported
//! capability set. No shared state; `resolve` is deterministic and
//! idempotent, so re-resolving an already resolved quality is a no-op.

use crate::models::quality::{CaptureQuality, DeviceCapability, FramerateRange, Resolution};

/// Resolve a requested quality against a capability set.
///
/// Returns `None` only when the capability set is empty; the session
/// rejects such devices before negotiating. Otherwise the result always
/// carries a resolution and a framerate drawn from the capability set —
/// never the unmodified request when the device does not support it.
/// The requested bitrate passes through unchanged.
pub fn resolve(requested: &CaptureQuality, capability: &DeviceCapability) -> Option<CaptureQuality> {
    let resolution = closest_resolution(&capability.resolutions, requested.resolution())?;
    let range = closest_framerate_range(&capability.framerate_ranges, requested.framerate)?;
    Some(
        requested
            .with_resolution(resolution)
            .with_framerate(range.clamp(requested.framerate)),
    )
}

/// The supported resolution nearest to `target`.
///
/// Distance is squared per-axis difference; ties prefer the smaller pixel
/// count, then listing order.
pub fn closest_resolution(supported: &[Resolution], target: Resolution) -> Option<Resolution> {
    supported
        .iter()
        .min_by_key(|r| (axis_distance(**r, target), r.pixels()))
        .copied()
}

/// The supported framerate range nearest to `fps`.
///
/// Ranges containing the requested rate win outright (distance zero);
/// among those, the narrower range is preferred, since a narrow range
/// leaves the camera less room to auto-adjust. Ranges that miss the rate
/// are ordered by the distance to their nearer bound, with the same
/// narrowness tie-break, then listing order.
pub fn closest_framerate_range(supported: &[FramerateRange], fps: u32) -> Option<FramerateRange> {
    supported
        .iter()
        .min_by_key(|r| (bound_distance(**r, fps), r.span()))
        .copied()
}

fn axis_distance(a: Resolution, b: Resolution) -> u64 {
    let dw = a.width.abs_diff(b.width) as u64;
    let dh = a.height.abs_diff(b.height) as u64;
    dw * dw + dh * dh
}

fn bound_distance(range: FramerateRange, fps: u32) -> u32 {
    if fps < range.min {
        range.min - fps
    } else if fps > range.max {
        fps - range.max
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability(
        resolutions: &[(u32, u32)],
        ranges: &[(u32, u32)],
    ) -> DeviceCapability {
        DeviceCapability {
            resolutions: resolutions.iter().map(|&(w, h)| Resolution::new(w, h)).collect(),
            framerate_ranges: ranges.iter().map(|&(lo, hi)| FramerateRange::new(lo, hi)).collect(),
            has_flash: false,
        }
    }

    #[test]
    fn picks_nearest_supported_resolution_and_containing_range() {
        let cap = capability(&[(640, 480), (1280, 720)], &[(15, 15), (24, 30)]);
        let requested = CaptureQuality::new(1920, 1080, 30, 2_000_000);

        let resolved = resolve(&requested, &cap).unwrap();
        assert_eq!(resolved, CaptureQuality::new(1280, 720, 30, 2_000_000));
    }

    #[test]
    fn result_always_drawn_from_capability() {
        let cap = capability(&[(320, 240), (800, 600), (1920, 1080)], &[(10, 20), (25, 60)]);
        let requests = [
            CaptureQuality::new(1, 1, 1, 0),
            CaptureQuality::new(4096, 4096, 240, 0),
            CaptureQuality::new(799, 601, 22, 0),
            CaptureQuality::default(),
        ];
        for requested in requests {
            let resolved = resolve(&requested, &cap).unwrap();
            assert!(cap.resolutions.contains(&resolved.resolution()));
            assert!(cap
                .framerate_ranges
                .iter()
                .any(|r| r.contains(resolved.framerate)));
        }
    }

    #[test]
    fn idempotent() {
        let cap = capability(
            &[(640, 480), (1280, 720), (1920, 1080)],
            &[(15, 15), (24, 30), (30, 60)],
        );
        for requested in [
            CaptureQuality::new(1000, 700, 45, 1_000_000),
            CaptureQuality::new(160, 120, 5, 500_000),
            CaptureQuality::new(1920, 1080, 30, 8_000_000),
        ] {
            let once = resolve(&requested, &cap).unwrap();
            let twice = resolve(&once, &cap).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn exact_resolution_match_wins() {
        let cap = capability(&[(640, 480), (1280, 720)], &[(30, 30)]);
        let requested = CaptureQuality::new(640, 480, 30, 0);
        assert_eq!(resolve(&requested, &cap).unwrap().resolution(), Resolution::new(640, 480));
    }

    #[test]
    fn resolution_tie_prefers_smaller_pixel_count() {
        // 600x600 is equidistant from 500x500 and 700x700 on both axes.
        let cap = capability(&[(700, 700), (500, 500)], &[(30, 30)]);
        let requested = CaptureQuality::new(600, 600, 30, 0);
        assert_eq!(resolve(&requested, &cap).unwrap().resolution(), Resolution::new(500, 500));
    }

    #[test]
    fn containing_range_beats_nearer_bound() {
        let cap = capability(&[(640, 480)], &[(29, 29), (10, 30)]);
        let resolved = resolve(&CaptureQuality::new(640, 480, 30, 0), &cap).unwrap();
        // [29,29] is closer by bound distance 1, but [10,30] contains 30.
        assert_eq!(resolved.framerate, 30);
        assert_eq!(
            closest_framerate_range(&cap.framerate_ranges, 30).unwrap(),
            FramerateRange::new(10, 30)
        );
    }

    #[test]
    fn framerate_tie_prefers_narrower_range() {
        let ranges = [FramerateRange::new(10, 60), FramerateRange::new(25, 35)];
        assert_eq!(closest_framerate_range(&ranges, 30).unwrap(), FramerateRange::new(25, 35));
    }

    #[test]
    fn framerate_clamped_into_chosen_range() {
        let cap = capability(&[(640, 480)], &[(15, 25)]);
        assert_eq!(resolve(&CaptureQuality::new(640, 480, 60, 0), &cap).unwrap().framerate, 25);
        assert_eq!(resolve(&CaptureQuality::new(640, 480, 5, 0), &cap).unwrap().framerate, 15);
    }

    #[test]
    fn bitrate_passes_through() {
        let cap = capability(&[(640, 480)], &[(30, 30)]);
        let resolved = resolve(&CaptureQuality::new(1920, 1080, 30, 7_500_000), &cap).unwrap();
        assert_eq!(resolved.bitrate, 7_500_000);
    }

    #[test]
    fn empty_capability_yields_none() {
        let requested = CaptureQuality::default();
        assert_eq!(resolve(&requested, &capability(&[], &[(30, 30)])), None);
        assert_eq!(resolve(&requested, &capability(&[(640, 480)], &[])), None);
    }
}
