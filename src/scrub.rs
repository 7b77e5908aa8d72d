/// Translates pointer-drag deltas into frame-store index offsets.
///
/// Drags are batched to a fixed pixel granularity (`step_px`, the original
/// scrub feel is 4 px per step). Batching truncates toward zero, so a drag of
/// `d` followed by `-d` returns to the starting right edge whenever neither
/// end of the store clamps the move. Only consulted while playback is paused.
pub struct ScrubController {
    step_px: usize,
}

impl ScrubController {
    pub fn new(step_px: usize) -> Self {
        Self {
            step_px: step_px.max(1),
        }
    }

    /// Frame offset for a raw pixel delta, floored to the step granularity.
    /// Positive delta = dragging right = moving back into history.
    pub fn offset_for(&self, delta_px: i32) -> i32 {
        let step = self.step_px as i32;
        delta_px / step * step
    }

    /// New right-edge index after a drag, or None when the store is still
    /// shorter than the viewport and there is no history to scrub over.
    pub fn target_right_edge(
        &self,
        delta_px: i32,
        right_edge: usize,
        viewport_width: usize,
        store_len: usize,
    ) -> Option<usize> {
        if store_len <= viewport_width {
            return None;
        }

        let offset = self.offset_for(delta_px) as i64;
        let proposed = right_edge as i64 - offset;
        Some(proposed.clamp(viewport_width as i64, store_len as i64) as usize)
    }
}
