#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    EaseOutCubic,
    EaseInOutSine,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Self::EaseInOutSine => -((std::f32::consts::PI * t).cos() - 1.0) * 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tween {
    Idle {
        value: f32,
    },
    Animating {
        start: f32,
        end: f32,
        elapsed: f32,
        duration: f32,
        easing: Easing,
    },
}

impl Default for Tween {
    fn default() -> Self {
        Self::Idle { value: 0.0 }
    }
}

impl Tween {
    pub fn at(value: f32) -> Self {
        Self::Idle { value }
    }

    /// Starts from the current value so retargeting mid-flight has no jump.
    pub fn animate_to(&mut self, end: f32, duration: f32, easing: Easing) {
        let start = self.value();
        *self = if duration <= 0.0 {
            Self::Idle { value: end }
        } else {
            Self::Animating {
                start,
                end,
                elapsed: 0.0,
                duration,
                easing,
            }
        };
    }

    pub fn advance(&mut self, dt: f32) -> f32 {
        if let Self::Animating {
            end,
            elapsed,
            duration,
            ..
        } = self
        {
            *elapsed += dt.max(0.0);
            if *elapsed >= *duration {
                *self = Self::Idle { value: *end };
            }
        }
        self.value()
    }

    pub fn value(&self) -> f32 {
        match *self {
            Self::Idle { value } => value,
            Self::Animating {
                start,
                end,
                elapsed,
                duration,
                easing,
            } => start + (end - start) * easing.apply(elapsed / duration),
        }
    }

    pub fn is_animating(&self) -> bool {
        matches!(self, Self::Animating { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tween_reaches_end_and_goes_idle() {
        let mut tween = Tween::at(-400.0);
        tween.animate_to(0.0, 0.5, Easing::EaseOutCubic);
        assert!(tween.is_animating());

        let mut last = tween.value();
        for _ in 0..12 {
            let value = tween.advance(0.05);
            assert!(value >= last);
            last = value;
        }

        assert!(!tween.is_animating());
        assert_eq!(tween.value(), 0.0);
    }

    #[test]
    fn zero_duration_snaps() {
        let mut tween = Tween::at(1.0);
        tween.animate_to(3.0, 0.0, Easing::Linear);
        assert_eq!(tween, Tween::Idle { value: 3.0 });
    }

    #[test]
    fn retarget_starts_from_current_value() {
        let mut tween = Tween::at(0.0);
        tween.animate_to(10.0, 1.0, Easing::Linear);
        tween.advance(0.5);
        tween.animate_to(0.0, 1.0, Easing::Linear);

        assert_eq!(tween.value(), 5.0);
    }

    #[test]
    fn easings_pin_endpoints() {
        for easing in [Easing::Linear, Easing::EaseOutCubic, Easing::EaseInOutSine] {
            assert!(easing.apply(0.0).abs() < 1e-6);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6);
        }
    }
}
