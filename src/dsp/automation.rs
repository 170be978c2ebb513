//! Gain automation
//!
//! A time-scheduled parameter with the subset of Web Audio `AudioParam`
//! behaviour the ambience needs: set-at-time, linear ramps, cancellation and
//! immediate value changes. Times are context seconds.

/// One scheduled change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`
    SetValue { time: f64, value: f32 },
    /// Ramp linearly from the previous event and reach `value` at `time`
    LinearRamp { time: f64, value: f32 },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. } | AutomationEvent::LinearRamp { time, .. } => time,
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            AutomationEvent::SetValue { value, .. } | AutomationEvent::LinearRamp { value, .. } => {
                value
            }
        }
    }
}

/// Automatable parameter
///
/// Events are kept sorted by time. The value before the first event is the
/// intrinsic value.
#[derive(Debug, Clone)]
pub struct AutomationParam {
    intrinsic: f32,
    events: Vec<AutomationEvent>,
}

impl AutomationParam {
    pub fn new(value: f32) -> Self {
        Self {
            intrinsic: value,
            events: Vec::new(),
        }
    }

    /// Scheduled events, in time order
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Schedule a jump to `value` at `time`
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::SetValue { time, value });
    }

    /// Schedule a linear ramp ending at `value` at `end_time`
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.insert(AutomationEvent::LinearRamp {
            time: end_time,
            value,
        });
    }

    /// Drop every event at or after `time`
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Set the value right now, discarding all automation
    pub fn set_value(&mut self, value: f32) {
        self.events.clear();
        self.intrinsic = value;
    }

    /// Computed value at `time`
    pub fn value_at(&self, time: f64) -> f32 {
        let mut value = self.intrinsic;
        let mut from_time = 0.0;

        for event in &self.events {
            match *event {
                AutomationEvent::SetValue { time: t, value: v } => {
                    if t > time {
                        break;
                    }
                    value = v;
                    from_time = t;
                }
                AutomationEvent::LinearRamp { time: end, value: target } => {
                    if end <= time {
                        value = target;
                        from_time = end;
                        continue;
                    }
                    let span = end - from_time;
                    if span <= 0.0 {
                        return target;
                    }
                    let progress = ((time - from_time) / span).clamp(0.0, 1.0) as f32;
                    return value + (target - value) * progress;
                }
            }
        }

        value
    }

    /// Fill `out` with per-sample values starting at `start_time`
    pub fn fill(&self, out: &mut [f32], start_time: f64, sample_rate: u32) {
        let step = 1.0 / sample_rate as f64;
        // Constant stretch, skip per-sample evaluation
        if self.events.is_empty() {
            out.fill(self.intrinsic);
            return;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.value_at(start_time + i as f64 * step);
        }
    }

    fn insert(&mut self, event: AutomationEvent) {
        // Events at equal times keep insertion order
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_intrinsic_value_without_events() {
        let param = AutomationParam::new(0.3);
        assert_eq!(param.value_at(0.0), 0.3);
        assert_eq!(param.value_at(100.0), 0.3);
    }

    #[test]
    fn test_fade_in_ramp() {
        let mut param = AutomationParam::new(0.0);
        param.set_value_at_time(0.0, 2.0);
        param.linear_ramp_to_value_at_time(0.08, 3.5);

        assert_eq!(param.value_at(1.0), 0.0);
        assert_eq!(param.value_at(2.0), 0.0);
        assert_abs_diff_eq!(param.value_at(2.75), 0.04, epsilon = 1e-6);
        assert_abs_diff_eq!(param.value_at(3.5), 0.08, epsilon = 1e-6);
        assert_abs_diff_eq!(param.value_at(10.0), 0.08, epsilon = 1e-6);
    }

    #[test]
    fn test_cancel_and_fade_out_from_mid_ramp() {
        let mut param = AutomationParam::new(0.0);
        param.set_value_at_time(0.0, 0.0);
        param.linear_ramp_to_value_at_time(0.08, 1.5);

        // Stop half way through the fade-in
        let now = 0.75;
        param.cancel_scheduled_values(now);
        let current = param.value_at(now);
        assert_abs_diff_eq!(current, 0.0, epsilon = 1e-6);

        // Cancelling removed the ramp, so re-pin the value the listener heard
        let mut param = AutomationParam::new(0.0);
        param.set_value_at_time(0.0, 0.0);
        param.linear_ramp_to_value_at_time(0.08, 1.5);
        let heard = param.value_at(now);
        param.cancel_scheduled_values(now);
        param.set_value_at_time(heard, now);
        param.linear_ramp_to_value_at_time(0.0, now + 0.5);

        assert_abs_diff_eq!(param.value_at(now), 0.04, epsilon = 1e-6);
        assert_abs_diff_eq!(param.value_at(now + 0.25), 0.02, epsilon = 1e-6);
        assert_eq!(param.value_at(now + 0.5), 0.0);
    }

    #[test]
    fn test_set_value_discards_automation() {
        let mut param = AutomationParam::new(0.0);
        param.linear_ramp_to_value_at_time(1.0, 10.0);
        param.set_value(0.5);
        assert!(param.events().is_empty());
        assert_eq!(param.value_at(5.0), 0.5);
    }

    #[test]
    fn test_events_sorted() {
        let mut param = AutomationParam::new(0.0);
        param.set_value_at_time(0.5, 2.0);
        param.set_value_at_time(0.2, 1.0);
        let times: Vec<f64> = param.events().iter().map(|e| e.time()).collect();
        assert_eq!(times, vec![1.0, 2.0]);
    }

    #[test]
    fn test_fill_matches_value_at() {
        let mut param = AutomationParam::new(0.0);
        param.set_value_at_time(0.0, 0.0);
        param.linear_ramp_to_value_at_time(1.0, 1.0);

        let mut out = vec![0.0; 4];
        param.fill(&mut out, 0.5, 4);
        assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[3], 1.0, epsilon = 1e-6);
    }
}
