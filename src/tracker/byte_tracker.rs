//! Main BYTETracker algorithm implementation.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{AssignmentError, ConfigError, TrackerError};
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::iou_batch;
use crate::tracker::strack::STrack;
use crate::tracker::track_set::TrackSet;
use crate::tracker::track_state::TrackState;

/// IoU distance gate for matching low-score detections to tracked tracks.
const LOW_SCORE_MATCH_THRESH: f32 = 0.5;
/// IoU distance gate for confirming tracks born on the previous frame.
const UNCONFIRMED_MATCH_THRESH: f32 = 0.7;
/// Tracked and lost tracks closer than this IoU distance are duplicates.
const DUPLICATE_IOU_DISTANCE: f32 = 0.15;
/// Removed ids retained for bookkeeping.
const REMOVED_HISTORY: usize = 1000;

/// Configuration for the BYTETracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Video frame rate, used to scale `track_buffer`
    pub frame_rate: u32,
    /// Frames a lost track is kept at 30 fps
    pub track_buffer: u32,
    /// Detections at or above this score take part in the first association
    pub track_thresh: f32,
    /// Minimum score for an unmatched detection to start a new track
    pub high_thresh: f32,
    /// IoU distance gate for the first association
    pub match_thresh: f32,
    /// Disable score fusion in the cost matrices (MOT20 evaluation setting)
    pub mot20: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            track_buffer: 30,
            track_thresh: 0.5,
            high_thresh: 0.6,
            match_thresh: 0.8,
            mot20: false,
        }
    }
}

impl TrackerConfig {
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_track_buffer(mut self, track_buffer: u32) -> Self {
        self.track_buffer = track_buffer;
        self
    }

    pub fn with_track_thresh(mut self, track_thresh: f32) -> Self {
        self.track_thresh = track_thresh;
        self
    }

    pub fn with_high_thresh(mut self, high_thresh: f32) -> Self {
        self.high_thresh = high_thresh;
        self
    }

    pub fn with_match_thresh(mut self, match_thresh: f32) -> Self {
        self.match_thresh = match_thresh;
        self
    }

    pub fn with_mot20(mut self, mot20: bool) -> Self {
        self.mot20 = mot20;
        self
    }

    /// Frames a lost track survives before it is removed.
    pub fn max_time_lost(&self) -> u32 {
        (self.frame_rate as f32 / 30.0 * self.track_buffer as f32).round() as u32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        for (name, value) in [
            ("track_thresh", self.track_thresh),
            ("high_thresh", self.high_thresh),
            ("match_thresh", self.match_thresh),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.high_thresh < self.track_thresh {
            return Err(ConfigError::HighBelowTrackThresh {
                high: self.high_thresh,
                track: self.track_thresh,
            });
        }
        Ok(())
    }
}

/// ByteTrack multi-object tracker.
///
/// Tracks live in one arena keyed by id; the tracked, lost and removed
/// collections are id sets over it, reconciled once per frame. Not
/// reentrant: feed one frame at a time.
pub struct BYTETracker {
    tracks: HashMap<u64, STrack>,
    tracked_stracks: TrackSet,
    lost_stracks: TrackSet,
    removed_stracks: TrackSet,
    frame_id: u32,
    track_id_count: u64,
    config: TrackerConfig,
    max_time_lost: u32,
}

impl BYTETracker {
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        let max_time_lost = config.max_time_lost();
        Ok(Self {
            tracks: HashMap::new(),
            tracked_stracks: TrackSet::new(),
            lost_stracks: TrackSet::new(),
            removed_stracks: TrackSet::new(),
            frame_id: 0,
            track_id_count: 0,
            config,
            max_time_lost,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of frames processed so far.
    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn max_time_lost(&self) -> u32 {
        self.max_time_lost
    }

    /// Tracks currently in the tracked set, confirmed or not.
    pub fn tracked_tracks(&self) -> impl Iterator<Item = &STrack> + '_ {
        self.resolve(&self.tracked_stracks)
    }

    pub fn lost_tracks(&self) -> impl Iterator<Item = &STrack> + '_ {
        self.resolve(&self.lost_stracks)
    }

    /// Ids of the most recently removed tracks, oldest first.
    pub fn removed_track_ids(&self) -> &[u64] {
        self.removed_stracks.as_slice()
    }

    /// Drop every track and restart frame and id numbering.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.tracked_stracks = TrackSet::new();
        self.lost_stracks = TrackSet::new();
        self.removed_stracks = TrackSet::new();
        self.frame_id = 0;
        self.track_id_count = 0;
    }

    /// Process one frame of detections and return the confirmed, visible tracks.
    ///
    /// Detections are checked before any state changes: a box with a
    /// non-finite field, a negative width or a height of zero or less is
    /// rejected with [`TrackerError::InvalidDetection`] and the frame is not
    /// counted.
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<STrack>, TrackerError> {
        if let Some(index) = detections.iter().position(|det| !det.is_trackable()) {
            log::warn!("frame {}: rejecting detection {index}", self.frame_id + 1);
            return Err(TrackerError::InvalidDetection { index });
        }

        self.frame_id += 1;
        let frame_id = self.frame_id;
        let fuse = !self.config.mot20;

        let mut matched = TrackSet::new();
        let mut new_lost = TrackSet::new();
        let mut new_removed = TrackSet::new();

        // Step 1: Split detections into high-score and low-score
        let (high_detections, low_detections): (Vec<Detection>, Vec<Detection>) = detections
            .iter()
            .partition(|det| det.score >= self.config.track_thresh);

        // Create track pool
        let (confirmed, unconfirmed): (Vec<u64>, Vec<u64>) = self
            .tracked_stracks
            .iter()
            .partition(|id| self.tracks[id].is_confirmed);
        let strack_pool = confirmed
            .into_iter()
            .collect::<TrackSet>()
            .joint(&self.lost_stracks);

        for id in strack_pool.iter() {
            if let Some(track) = self.tracks.get_mut(&id) {
                track.predict();
            }
        }

        // Step 2: First association, with high score detections
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = self.associate(
            strack_pool.as_slice(),
            &high_detections,
            self.config.match_thresh,
            fuse,
        )?;

        for (itracked, idet) in matches {
            let id = strack_pool.as_slice()[itracked];
            self.update_track(id, &high_detections[idet], &mut matched)?;
        }

        // Only tracks that were tracked get a second chance; lost ones wait
        let r_tracked_stracks: Vec<u64> = unmatched_tracks
            .iter()
            .map(|&idx| strack_pool.as_slice()[idx])
            .filter(|id| self.tracks[id].state == TrackState::Tracked)
            .collect();
        let remain_detections: Vec<Detection> = unmatched_detections
            .iter()
            .map(|&idx| high_detections[idx])
            .collect();

        // Step 3: Second association, with low score detection boxes
        let AssignmentResult {
            matches: matches_second,
            unmatched_tracks: unmatched_tracks_second,
            ..
        } = self.associate(
            &r_tracked_stracks,
            &low_detections,
            LOW_SCORE_MATCH_THRESH,
            false,
        )?;

        for (itracked, idet) in matches_second {
            self.update_track(r_tracked_stracks[itracked], &low_detections[idet], &mut matched)?;
        }

        for idx in unmatched_tracks_second {
            let id = r_tracked_stracks[idx];
            if let Some(track) = self.tracks.get_mut(&id) {
                if track.state != TrackState::Lost {
                    track.mark_lost();
                    trace!("frame {frame_id}: {track} lost");
                    new_lost.insert(id);
                }
            }
        }

        // Deal with unconfirmed tracks, usually tracks with only one beginning frame
        let AssignmentResult {
            matches: matches_unconfirmed,
            unmatched_tracks: unmatched_unconfirmed,
            unmatched_detections: unmatched_new,
        } = self.associate(
            &unconfirmed,
            &remain_detections,
            UNCONFIRMED_MATCH_THRESH,
            fuse,
        )?;

        for (itracked, idet) in matches_unconfirmed {
            self.update_track(unconfirmed[itracked], &remain_detections[idet], &mut matched)?;
        }
        for idx in unmatched_unconfirmed {
            let id = unconfirmed[idx];
            if let Some(track) = self.tracks.get_mut(&id) {
                track.mark_removed();
                trace!("frame {frame_id}: unconfirmed {track} removed");
                new_removed.insert(id);
            }
        }

        // Step 4: Init new stracks
        for idx in unmatched_new {
            let det = &remain_detections[idx];
            if det.score < self.config.high_thresh {
                continue;
            }
            self.track_id_count += 1;
            let track = STrack::new(det, frame_id, self.track_id_count);
            trace!("frame {frame_id}: new track {track}");
            matched.insert(track.track_id);
            self.tracks.insert(track.track_id, track);
        }

        // Step 5: Update state
        for id in self.lost_stracks.iter() {
            if let Some(track) = self.tracks.get_mut(&id) {
                if frame_id - track.end_frame() > self.max_time_lost {
                    track.mark_removed();
                    trace!("frame {frame_id}: {track} expired");
                    new_removed.insert(id);
                }
            }
        }

        self.removed_stracks = self.removed_stracks.joint(&new_removed);
        let lost_stracks = self
            .lost_stracks
            .sub(&matched)
            .joint(&new_lost)
            .sub(&self.removed_stracks);
        self.removed_stracks.keep_last(REMOVED_HISTORY);

        let (tracked, lost) = self.remove_duplicate_stracks(&matched, &lost_stracks);
        self.tracked_stracks = tracked;
        self.lost_stracks = lost;
        debug_assert!(self.tracked_stracks.is_disjoint(&self.lost_stracks));

        let live: HashSet<u64> = self
            .tracked_stracks
            .iter()
            .chain(self.lost_stracks.iter())
            .collect();
        self.tracks.retain(|id, _| live.contains(id));

        debug!(
            "frame {}: {} high / {} low detections -> {} tracked, {} lost, {} removed",
            frame_id,
            high_detections.len(),
            low_detections.len(),
            self.tracked_stracks.len(),
            self.lost_stracks.len(),
            new_removed.len(),
        );

        Ok(self
            .tracked_tracks()
            .filter(|t| t.is_confirmed)
            .cloned()
            .collect())
    }

    fn resolve<'a>(&'a self, ids: &'a TrackSet) -> impl Iterator<Item = &'a STrack> + 'a {
        ids.iter().filter_map(|id| self.tracks.get(&id))
    }

    fn update_track(
        &mut self,
        id: u64,
        det: &Detection,
        matched: &mut TrackSet,
    ) -> Result<(), TrackerError> {
        if let Some(track) = self.tracks.get_mut(&id) {
            track.update(det, self.frame_id)?;
            matched.insert(id);
        }
        Ok(())
    }

    /// IoU association between the given tracks and detections.
    fn associate(
        &self,
        track_ids: &[u64],
        detections: &[Detection],
        thresh: f32,
        fuse: bool,
    ) -> Result<AssignmentResult, AssignmentError> {
        let track_rects: Vec<_> = track_ids.iter().map(|id| self.tracks[id].rect()).collect();
        let det_rects: Vec<_> = detections.iter().map(|d| d.bbox).collect();
        let mut dists = matching::iou_distance(&track_rects, &det_rects);
        if fuse {
            matching::fuse_score(&mut dists, detections);
        }
        matching::linear_assignment(&dists, thresh)
    }

    /// Resolve overlaps between the tracked and lost sets in favour of the
    /// track that has been alive longer.
    fn remove_duplicate_stracks(&self, a: &TrackSet, b: &TrackSet) -> (TrackSet, TrackSet) {
        let stracksa: Vec<&STrack> = self.resolve(a).collect();
        let stracksb: Vec<&STrack> = self.resolve(b).collect();
        let (dupa, dupb) = duplicate_masks(&stracksa, &stracksb);

        let resa = stracksa
            .iter()
            .zip(dupa)
            .filter(|(_, dup)| !dup)
            .map(|(t, _)| t.track_id)
            .collect();
        let resb = stracksb
            .iter()
            .zip(dupb)
            .filter(|(_, dup)| !dup)
            .map(|(t, _)| t.track_id)
            .collect();
        (resa, resb)
    }
}

/// Flag, for every overlapping pair, whichever of the two tracks is younger.
fn duplicate_masks(stracksa: &[&STrack], stracksb: &[&STrack]) -> (Vec<bool>, Vec<bool>) {
    let mut dupa = vec![false; stracksa.len()];
    let mut dupb = vec![false; stracksb.len()];
    if stracksa.is_empty() || stracksb.is_empty() {
        return (dupa, dupb);
    }

    let a_rects: Vec<_> = stracksa.iter().map(|t| t.rect()).collect();
    let b_rects: Vec<_> = stracksb.iter().map(|t| t.rect()).collect();
    let ious = iou_batch(&a_rects, &b_rects);

    for ((i, j), &iou) in ious.indexed_iter() {
        if 1.0 - iou < DUPLICATE_IOU_DISTANCE {
            if stracksa[i].duration() > stracksb[j].duration() {
                dupb[j] = true;
            } else {
                dupa[i] = true;
            }
        }
    }
    (dupa, dupb)
}
