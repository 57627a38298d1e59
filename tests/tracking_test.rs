use approx::assert_abs_diff_eq;
use bytetrack::{BYTETracker, Detection, Rect, TrackState, TrackerConfig, TrackerError};

fn tracker() -> BYTETracker {
    BYTETracker::new(TrackerConfig::default()).unwrap()
}

fn ids(tracks: &[bytetrack::STrack]) -> Vec<u64> {
    tracks.iter().map(|t| t.track_id).collect()
}

#[test]
fn test_basic_tracking() {
    let mut tracker = tracker();

    // Frame 1: One detection
    let tracks1 = tracker
        .update(&[Detection::from_tlbr(100.0, 100.0, 200.0, 200.0, 0.9)])
        .unwrap();
    // Born on the first frame, so confirmed straight away.
    assert_eq!(tracks1.len(), 1);
    let id1 = tracks1[0].track_id;

    // Frame 2: Same object moved slightly
    let tracks2 = tracker
        .update(&[Detection::from_tlbr(105.0, 105.0, 205.0, 205.0, 0.9)])
        .unwrap();
    assert_eq!(tracks2.len(), 1);
    assert_eq!(tracks2[0].track_id, id1); // ID should persist

    // Frame 3: Object occluded (low score), recovered by the second association
    let tracks3 = tracker
        .update(&[Detection::from_tlbr(110.0, 110.0, 210.0, 210.0, 0.2)])
        .unwrap();
    assert_eq!(tracks3.len(), 1);
    assert_eq!(tracks3[0].track_id, id1);

    // Frame 4: Object disappears
    let tracks4 = tracker.update(&[]).unwrap();
    assert_eq!(tracks4.len(), 0);
    assert_eq!(tracker.lost_tracks().count(), 1);

    // Frame 5: Object reappears within the buffer and is refound
    let tracks5 = tracker
        .update(&[Detection::from_tlbr(115.0, 115.0, 215.0, 215.0, 0.9)])
        .unwrap();
    assert_eq!(tracks5.len(), 1);
    assert_eq!(tracks5[0].track_id, id1);
    assert_eq!(tracks5[0].state, TrackState::Tracked);
    assert_eq!(tracks5[0].tracklet_len, 0);
}

#[test]
fn test_two_objects_then_expiry() {
    let mut tracker = tracker();
    let dets = [
        Detection::from_tlwh(0.0, 0.0, 50.0, 50.0, 0.9),
        Detection::from_tlwh(200.0, 200.0, 40.0, 40.0, 0.9),
    ];

    let frame1 = tracker.update(&dets).unwrap();
    assert_eq!(ids(&frame1), vec![1, 2]);
    assert!(frame1.iter().all(|t| t.is_confirmed));
    assert_eq!(frame1[0].rect(), dets[0].bbox);
    assert_eq!(frame1[1].rect(), dets[1].bbox);

    let frame2 = tracker.update(&dets).unwrap();
    assert_eq!(ids(&frame2), vec![1, 2]);
    for (track, det) in frame2.iter().zip(&dets) {
        assert_eq!(track.tracklet_len, 1);
        assert_abs_diff_eq!(track.rect().top, det.bbox.top, epsilon = 1e-3);
        assert_abs_diff_eq!(track.rect().left, det.bbox.left, epsilon = 1e-3);
        assert_abs_diff_eq!(track.rect().width, det.bbox.width, epsilon = 1e-3);
        assert_abs_diff_eq!(track.rect().height, det.bbox.height, epsilon = 1e-3);
    }

    let max_time_lost = tracker.max_time_lost();
    for _ in 0..max_time_lost {
        assert!(tracker.update(&[]).unwrap().is_empty());
    }
    assert_eq!(tracker.lost_tracks().count(), 2);
    assert!(
        tracker
            .lost_tracks()
            .all(|t| t.state == TrackState::Lost)
    );

    assert!(tracker.update(&[]).unwrap().is_empty());
    assert_eq!(tracker.lost_tracks().count(), 0);
    assert_eq!(tracker.tracked_tracks().count(), 0);
    assert_eq!(tracker.removed_track_ids(), &[1, 2]);
}

#[test]
fn test_consistent_detections_never_lose_track() {
    let mut tracker = tracker();
    for frame in 1..=50u32 {
        let left = 3.0 * frame as f32;
        let tracks = tracker
            .update(&[Detection::from_tlwh(40.0, left, 50.0, 50.0, 0.9)])
            .unwrap();

        assert_eq!(ids(&tracks), vec![1]);
        assert_eq!(tracks[0].tracklet_len, frame - 1);
        assert_eq!(tracker.lost_tracks().count(), 0);
    }
}

#[test]
fn test_new_track_needs_confirmation() {
    let mut tracker = tracker();
    let det = Detection::from_tlwh(10.0, 10.0, 60.0, 60.0, 0.9);

    assert!(tracker.update(&[]).unwrap().is_empty());

    // Born on frame 2: tracked but not yet confirmed, so not reported.
    assert!(tracker.update(&[det]).unwrap().is_empty());
    let pending: Vec<_> = tracker.tracked_tracks().collect();
    assert_eq!(pending.len(), 1);
    assert!(!pending[0].is_confirmed);

    let tracks = tracker.update(&[det]).unwrap();
    assert_eq!(ids(&tracks), vec![1]);
    assert!(tracks[0].is_confirmed);
}

#[test]
fn test_unconfirmed_track_is_removed_when_unmatched() {
    let mut tracker = tracker();
    let det = Detection::from_tlwh(10.0, 10.0, 60.0, 60.0, 0.9);

    tracker.update(&[]).unwrap();
    tracker.update(&[det]).unwrap();
    tracker.update(&[]).unwrap();

    assert_eq!(tracker.tracked_tracks().count(), 0);
    assert_eq!(tracker.lost_tracks().count(), 0);
    assert_eq!(tracker.removed_track_ids(), &[1]);

    // The id is not reused.
    tracker.update(&[det]).unwrap();
    let pending: Vec<_> = tracker.tracked_tracks().map(|t| t.track_id).collect();
    assert_eq!(pending, vec![2]);
}

#[test]
fn test_track_ids_are_unique_and_increasing() {
    let mut tracker = tracker();
    let mut tracks = Vec::new();
    for frame in 1..=5 {
        let dets: Vec<_> = (0..frame)
            .map(|i| Detection::from_tlwh(0.0, 100.0 * i as f32, 50.0, 50.0, 0.9))
            .collect();
        tracks = tracker.update(&dets).unwrap();
    }

    assert_eq!(ids(&tracks), vec![1, 2, 3, 4]);
    let all: Vec<_> = tracker.tracked_tracks().map(|t| t.track_id).collect();
    assert_eq!(all, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_scores_below_high_thresh_do_not_start_tracks() {
    let mut tracker = tracker();
    let tracks = tracker
        .update(&[
            Detection::from_tlwh(0.0, 0.0, 50.0, 50.0, 0.55),
            Detection::from_tlwh(200.0, 200.0, 50.0, 50.0, 0.3),
        ])
        .unwrap();

    assert!(tracks.is_empty());
    assert_eq!(tracker.tracked_tracks().count(), 0);
}

#[test]
fn test_mot20_disables_score_fusion() {
    // IoU between the two boxes is about 0.29: enough for the first
    // association gate on its own, not once multiplied by a 0.6 score.
    let first = Detection::from_tlwh(0.0, 0.0, 100.0, 100.0, 0.9);
    let shifted = Detection::from_tlwh(0.0, 55.0, 100.0, 100.0, 0.6);

    let mut fused = tracker();
    fused.update(&[first]).unwrap();
    assert!(fused.update(&[shifted]).unwrap().is_empty());
    assert_eq!(fused.lost_tracks().map(|t| t.track_id).collect::<Vec<_>>(), vec![1]);

    let mut plain = BYTETracker::new(TrackerConfig::default().with_mot20(true)).unwrap();
    plain.update(&[first]).unwrap();
    let tracks = plain.update(&[shifted]).unwrap();
    assert_eq!(ids(&tracks), vec![1]);
    assert_eq!(tracks[0].score(), 0.6);
}

#[test]
fn test_overlapping_lost_duplicate_is_dropped() {
    let mut tracker = tracker();
    let det = Detection::from_tlwh(0.0, 0.0, 50.0, 50.0, 0.9);

    // Two identical detections start two tracks on the same object.
    assert_eq!(tracker.update(&[det, det]).unwrap().len(), 2);

    // Only one of them is matched; the other would be lost, but it sits on
    // top of the longer-lived survivor and is dropped instead.
    let tracks = tracker.update(&[det]).unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].duration(), 1);
    assert_eq!(tracker.lost_tracks().count(), 0);
    assert!(tracker.removed_track_ids().is_empty());
}

#[test]
fn test_custom_buffer_shortens_retention() {
    let config = TrackerConfig::default().with_track_buffer(5);
    let mut tracker = BYTETracker::new(config).unwrap();
    assert_eq!(tracker.max_time_lost(), 5);

    let det = Detection::new(Rect::new(0.0, 0.0, 80.0, 80.0), 0.9);
    tracker.update(&[det]).unwrap();
    tracker.update(&[det]).unwrap();

    for _ in 0..5 {
        tracker.update(&[]).unwrap();
    }
    assert_eq!(tracker.lost_tracks().count(), 1);

    tracker.update(&[]).unwrap();
    assert_eq!(tracker.lost_tracks().count(), 0);
    assert_eq!(tracker.removed_track_ids(), &[1]);
}

#[test]
fn test_zero_height_detection_is_rejected_without_side_effects() {
    let mut tracker = tracker();
    let healthy = Detection::from_tlwh(200.0, 200.0, 40.0, 40.0, 0.9);
    tracker.update(&[healthy]).unwrap();

    let flat = Detection::from_tlwh(0.0, 0.0, 10.0, 0.0, 0.9);
    let err = tracker.update(&[healthy, flat]).unwrap_err();
    assert!(matches!(err, TrackerError::InvalidDetection { index: 1 }));
    assert_eq!(tracker.frame_id(), 1);
    let pending: Vec<_> = tracker.tracked_tracks().collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tracklet_len, 0);

    // The tracker keeps working on later frames.
    for frame in 2..=40u32 {
        let tracks = tracker.update(&[healthy]).unwrap();
        assert_eq!(ids(&tracks), vec![1]);
        assert_eq!(tracks[0].tracklet_len, frame - 1);
        assert!(tracks[0].rect().height.is_finite());
    }
}

#[test]
fn test_lost_track_is_not_recovered_by_low_score_detection() {
    let mut tracker = tracker();
    let det = Detection::from_tlwh(50.0, 50.0, 60.0, 60.0, 0.9);
    tracker.update(&[det]).unwrap();

    assert!(tracker.update(&[]).unwrap().is_empty());
    assert_eq!(tracker.lost_tracks().count(), 1);

    // Only tracks still tracked take part in the low-score association.
    let faint = Detection { score: 0.3, ..det };
    assert!(tracker.update(&[faint]).unwrap().is_empty());
    assert_eq!(tracker.lost_tracks().count(), 1);
    assert_eq!(tracker.tracked_tracks().count(), 0);
}
