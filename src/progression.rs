//! Score-gated effect progression.
//!
//! A fixed ladder of visual effects, each unlocked exactly once when the
//! score first reaches its threshold. There is no deactivation path: the
//! ladder only climbs.

/// One visual effect on the progression ladder.
///
/// `Rainbow` is not a post-processing pass; it enables the hue-scroll term
/// in the cube's surface shader. Everything else appends a pass to the
/// post-processing chain when unlocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    Bloom,
    Vignette,
    Glitch,
    Rainbow,
    Film,
    DotScreen,
    Bokeh,
    Halftone,
}

impl Effect {
    /// All effects in ascending threshold order.
    pub const ALL: [Effect; 8] = [
        Effect::Bloom,
        Effect::Vignette,
        Effect::Glitch,
        Effect::Rainbow,
        Effect::Film,
        Effect::DotScreen,
        Effect::Bokeh,
        Effect::Halftone,
    ];

    /// Score at which this effect unlocks.
    pub fn threshold(self) -> u32 {
        match self {
            Effect::Bloom => 200,
            Effect::Vignette => 500,
            Effect::Glitch => 700,
            Effect::Rainbow => 1000,
            Effect::Film => 2000,
            Effect::DotScreen => 3000,
            Effect::Bokeh => 5000,
            Effect::Halftone => 10000,
        }
    }

    /// Whether unlocking this effect appends a post-processing pass.
    pub fn is_pass(self) -> bool {
        !matches!(self, Effect::Rainbow)
    }

    pub fn label(self) -> &'static str {
        match self {
            Effect::Bloom => "bloom",
            Effect::Vignette => "vignette",
            Effect::Glitch => "glitch",
            Effect::Rainbow => "rainbow",
            Effect::Film => "film",
            Effect::DotScreen => "dot_screen",
            Effect::Bokeh => "bokeh",
            Effect::Halftone => "halftone",
        }
    }

    fn index(self) -> usize {
        match self {
            Effect::Bloom => 0,
            Effect::Vignette => 1,
            Effect::Glitch => 2,
            Effect::Rainbow => 3,
            Effect::Film => 4,
            Effect::DotScreen => 5,
            Effect::Bokeh => 6,
            Effect::Halftone => 7,
        }
    }
}

/// Tracks which effects have unlocked so far.
///
/// Activation state is an enum-indexed array rather than a name-keyed map,
/// so "already activated" checks are exhaustive and typo-proof.
#[derive(Clone, Debug, Default)]
pub struct Progression {
    activated: [bool; Effect::ALL.len()],
}

impl Progression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, effect: Effect) -> bool {
        self.activated[effect.index()]
    }

    /// Effects unlocked so far, in ladder order.
    pub fn active(&self) -> impl Iterator<Item = Effect> + '_ {
        Effect::ALL.iter().copied().filter(|e| self.is_active(*e))
    }

    /// Unlock every effect whose threshold the score has newly met.
    ///
    /// Returns the freshly unlocked effects in ascending threshold order.
    /// Each effect is reported exactly once over the lifetime of the
    /// progression, no matter how the score jumps.
    pub fn advance(&mut self, score: u32) -> Vec<Effect> {
        let mut unlocked = Vec::new();
        for effect in Effect::ALL {
            if score >= effect.threshold() && !self.is_active(effect) {
                self.activated[effect.index()] = true;
                unlocked.push(effect);
            }
        }
        unlocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_strictly_ascending() {
        let mut prev = 0;
        for effect in Effect::ALL {
            assert!(effect.threshold() > prev, "{:?} out of order", effect);
            prev = effect.threshold();
        }
    }

    #[test]
    fn nothing_unlocks_below_first_threshold() {
        let mut p = Progression::new();
        assert!(p.advance(0).is_empty());
        assert!(p.advance(199).is_empty());
        assert_eq!(p.active().count(), 0);
    }

    #[test]
    fn single_jump_unlocks_only_reached_effects() {
        let mut p = Progression::new();
        let unlocked = p.advance(250);
        assert_eq!(unlocked, vec![Effect::Bloom]);
        assert!(p.is_active(Effect::Bloom));
        assert!(!p.is_active(Effect::Vignette));
        assert!(!p.is_active(Effect::Glitch));
    }

    #[test]
    fn big_jump_unlocks_in_ladder_order() {
        let mut p = Progression::new();
        let unlocked = p.advance(3000);
        assert_eq!(
            unlocked,
            vec![
                Effect::Bloom,
                Effect::Vignette,
                Effect::Glitch,
                Effect::Rainbow,
                Effect::Film,
                Effect::DotScreen,
            ]
        );
    }

    #[test]
    fn each_effect_reported_once() {
        let mut p = Progression::new();
        assert_eq!(p.advance(600), vec![Effect::Bloom, Effect::Vignette]);
        assert!(p.advance(600).is_empty());
        assert_eq!(p.advance(800), vec![Effect::Glitch]);
        assert!(p.advance(800).is_empty());
    }

    #[test]
    fn active_set_matches_thresholds_for_any_score() {
        for score in [0u32, 199, 200, 499, 500, 999, 1000, 4999, 5000, 10000, 50000] {
            let mut p = Progression::new();
            p.advance(score);
            for effect in Effect::ALL {
                assert_eq!(
                    p.is_active(effect),
                    score >= effect.threshold(),
                    "score {} effect {:?}",
                    score,
                    effect
                );
            }
        }
    }

    #[test]
    fn rainbow_is_not_a_pass() {
        assert!(!Effect::Rainbow.is_pass());
        assert_eq!(Effect::ALL.iter().filter(|e| e.is_pass()).count(), 7);
    }
}
