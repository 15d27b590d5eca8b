use crate::parser::GraphicControl;

/// Index of the frame that should be displayed at `t_cs` centiseconds into
/// a single run of the animation: the first frame whose running delay sum
/// strictly exceeds `t_cs`.
///
/// Falls back to the last frame when no sum does (which only happens
/// through float edge cases once callers have wrapped or clamped `t_cs`).
/// Callers guarantee at least one frame.
pub(crate) fn frame_index_for(controls: &[GraphicControl], t_cs: f64) -> usize {
    let mut sum: u32 = 0;
    for (i, control) in controls.iter().enumerate() {
        sum += u32::from(control.delay);
        if f64::from(sum) > t_cs {
            return i;
        }
    }
    controls.len() - 1
}

/// Frame selection for one-off time lookups. When looping, the time wraps
/// modulo the total runtime; otherwise anything at or past the end clamps
/// to the last frame. Negative times read as zero.
pub(crate) fn frame_index_at_time(
    controls: &[GraphicControl],
    total_delay_cs: u32,
    seconds: f64,
    looping: bool,
) -> usize {
    let t_cs = (seconds * 100.0).max(0.0);
    if total_delay_cs == 0 {
        // Every frame is zero-length; there is nothing to reach but the end.
        return if looping { 0 } else { controls.len() - 1 };
    }
    let total = f64::from(total_delay_cs);
    if looping {
        frame_index_for(controls, t_cs % total)
    } else if t_cs >= total {
        controls.len() - 1
    } else {
        frame_index_for(controls, t_cs)
    }
}

/// Playback state of a streaming decoding mode (or of one independent
/// cursor): how much time has been fed in and which frame the current
/// canvas shows.
#[derive(Debug)]
pub(crate) struct PlaybackClock {
    accumulated_seconds: f64,

    /// Index of the frame the current canvas corresponds to.
    /// Should always be a valid index.
    pub current_frame: usize,
}

impl PlaybackClock {
    pub(crate) fn new() -> PlaybackClock {
        PlaybackClock {
            accumulated_seconds: 0.,
            current_frame: 0,
        }
    }

    /// Feed a time delta and select the frame that should now be shown.
    ///
    /// Returns `Some(target)` when the selection differs from the current
    /// frame (the caller recomposes its canvas and then records the new
    /// `current_frame`) and `None` when nothing changes. Non-positive
    /// deltas are ignored. Note that a large delta may select a frame
    /// several steps away; the wrap is a plain modulo, never a replay of
    /// the frames in between.
    pub(crate) fn tick(
        &mut self,
        delta_seconds: f64,
        controls: &[GraphicControl],
        total_delay_cs: u32,
    ) -> Option<usize> {
        if delta_seconds <= 0. {
            return None;
        }
        self.accumulated_seconds += delta_seconds;
        if total_delay_cs == 0 {
            return None;
        }
        let t_cs = (self.accumulated_seconds * 100.0) % f64::from(total_delay_cs);
        let target = frame_index_for(controls, t_cs);
        if target == self.current_frame {
            None
        } else {
            Some(target)
        }
    }
}
