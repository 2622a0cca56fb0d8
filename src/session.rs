//! Game session state.
//!
//! All mutable toy state lives here: the score, the press latch, the
//! cube's spin and press-scale, the rainbow scroll and the effect
//! progression. The render loop owns a single `GameSession` and calls
//! [`GameSession::update`] once per frame; nothing in this module touches
//! the GPU.

use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera::CameraUniforms;
use crate::config::AppConfig;
use crate::interaction::{pointer_ray, ray_hits_box, PointerState};
use crate::progression::{Effect, Progression};

/// Block texture identifiers, in their fixed display order. Texture files
/// are expected as `<name>.png` in the asset directory.
pub const TEXTURE_NAMES: [&str; 13] = [
    "brick",
    "cobblestone",
    "diamond_ore",
    "grass_block_top",
    "netherrack",
    "sponge",
    "enchant",
    "end",
    "glowstone",
    "none",
    "pumkin",
    "spawner",
    "tnt",
];

/// Random texture draws are bounded to the first entries of
/// [`TEXTURE_NAMES`]; the tail of the list is display-only.
pub const RANDOM_TEXTURE_SPAN: usize = 6;

/// Score added per successful hit, inclusive bounds.
pub const SCORE_STEP: (u32, u32) = (5, 15);

/// What changed during one frame; the render loop reacts to this.
#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    /// Effects freshly unlocked this frame, in ladder order.
    pub unlocked: Vec<Effect>,
    /// The score display needs regenerating.
    pub score_changed: bool,
    /// The cube's texture binding needs swapping.
    pub texture_changed: bool,
    /// First successful press of the session: start the music.
    pub start_audio: bool,
}

pub struct GameSession {
    config: AppConfig,
    score: u32,
    progression: Progression,
    texture_index: usize,
    rainbow_rate: f32,
    scroll: f32,
    spin: f32,
    tilt: f32,
    scale: f32,
    /// Press latch: one texture/score mutation per discrete press.
    change_allowed: bool,
    auto_rotate: bool,
    audio_started: bool,
    rng: StdRng,
}

impl GameSession {
    pub fn new(config: AppConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            score: 0,
            progression: Progression::new(),
            texture_index: 0,
            rainbow_rate: 0.0,
            scroll: 0.0,
            spin: 0.0,
            tilt: 0.5,
            scale: 1.0,
            change_allowed: true,
            auto_rotate: true,
            audio_started: false,
            rng,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn texture_index(&self) -> usize {
        self.texture_index
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn rainbow_rate(&self) -> f32 {
        self.rainbow_rate
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    /// Hue scrolling is enabled once the rainbow step has unlocked.
    pub fn scroll_enabled(&self) -> bool {
        self.progression.is_active(Effect::Rainbow)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Camera drag state from the orbit controller; dragging pauses the
    /// idle spin.
    pub fn set_dragging(&mut self, dragging: bool) {
        self.auto_rotate = !dragging;
    }

    pub fn half_extent(&self) -> Vec3 {
        Vec3::splat(self.config.cube_size * 0.5)
    }

    /// Cube model matrix: fixed tilt, accumulated spin, press scale.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_euler(glam::EulerRot::XYZ, self.tilt, self.spin, 0.0)
            * Mat4::from_scale(Vec3::splat(self.scale))
    }

    /// Advance one frame.
    ///
    /// Order matches the render loop contract: idle spin, progression
    /// ladder, scroll accumulation, then hit-testing against the held
    /// pointer.
    pub fn update(
        &mut self,
        dt: f32,
        pointer: &PointerState,
        camera: &CameraUniforms,
    ) -> FrameReport {
        let mut report = FrameReport::default();

        if self.auto_rotate {
            self.spin += self.config.rotation_speed * dt;
            self.spin %= std::f32::consts::TAU;
        }

        report.unlocked = self.progression.advance(self.score);
        if report.unlocked.contains(&Effect::Rainbow) {
            self.rainbow_rate = 0.3;
        }
        // Deliberately unguarded: re-assigned every frame past 1500,
        // unlike the one-shot steps. Idempotent.
        if self.score >= 1500 {
            self.rainbow_rate = 2.0;
        }
        self.scroll += self.rainbow_rate;

        if pointer.down {
            if let Some(ndc) = pointer.ndc {
                let ray = pointer_ray(ndc, camera);
                if ray_hits_box(&ray, self.model_matrix(), self.half_extent()).is_some() {
                    self.scale = self.config.press_scale;
                    if self.change_allowed {
                        self.texture_index = self.rng.gen_range(0..RANDOM_TEXTURE_SPAN);
                        self.score += self.rng.gen_range(SCORE_STEP.0..=SCORE_STEP.1);
                        self.change_allowed = false;
                        report.score_changed = true;
                        report.texture_changed = true;
                        if !self.audio_started {
                            self.audio_started = true;
                            report.start_audio = true;
                        }
                        log::debug!("hit: score {}", self.score);
                    }
                }
            }
        } else {
            self.change_allowed = true;
            self.scale = 1.0;
        }

        report
    }

    #[cfg(test)]
    pub(crate) fn force_score(&mut self, score: u32) {
        self.score = score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::config::OrbitConfig;
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    fn camera() -> CameraUniforms {
        OrbitCamera::new(OrbitConfig::default()).to_uniforms(16.0 / 9.0)
    }

    fn session() -> GameSession {
        GameSession::new(AppConfig::default(), Some(7))
    }

    fn center_press() -> PointerState {
        PointerState {
            down: true,
            ndc: Some(Vec2::ZERO),
        }
    }

    fn released() -> PointerState {
        PointerState {
            down: false,
            ndc: Some(Vec2::ZERO),
        }
    }

    #[test]
    fn hit_increments_score_within_bounds() {
        let mut session = session();
        let camera = camera();
        let report = session.update(DT, &center_press(), &camera);
        assert!(report.score_changed);
        assert!(report.texture_changed);
        assert!((SCORE_STEP.0..=SCORE_STEP.1).contains(&session.score()));
        assert!(session.texture_index() < RANDOM_TEXTURE_SPAN);
    }

    #[test]
    fn held_press_scores_only_once() {
        let mut session = session();
        let camera = camera();
        session.update(DT, &center_press(), &camera);
        let after_first = session.score();
        for _ in 0..30 {
            let report = session.update(DT, &center_press(), &camera);
            assert!(!report.score_changed);
        }
        assert_eq!(session.score(), after_first);
    }

    #[test]
    fn release_rearms_the_latch_and_resets_scale() {
        let mut session = session();
        let camera = camera();
        session.update(DT, &center_press(), &camera);
        assert_eq!(session.scale(), 1.2);

        session.update(DT, &released(), &camera);
        assert_eq!(session.scale(), 1.0);

        let report = session.update(DT, &center_press(), &camera);
        assert!(report.score_changed);
    }

    #[test]
    fn miss_changes_nothing() {
        let mut session = session();
        let camera = camera();
        let miss = PointerState {
            down: true,
            ndc: Some(Vec2::new(0.97, 0.95)),
        };
        for _ in 0..10 {
            let report = session.update(DT, &miss, &camera);
            assert!(!report.score_changed);
            assert!(!report.texture_changed);
            assert!(!report.start_audio);
        }
        assert_eq!(session.score(), 0);
        assert_eq!(session.texture_index(), 0);
    }

    #[test]
    fn score_is_monotonic_over_many_presses() {
        let mut session = session();
        let camera = camera();
        let mut last = 0;
        for _ in 0..50 {
            session.update(DT, &center_press(), &camera);
            assert!(session.score() >= last);
            let gained = session.score() - last;
            assert!(gained >= SCORE_STEP.0 && gained <= SCORE_STEP.1);
            last = session.score();
            session.update(DT, &released(), &camera);
        }
    }

    #[test]
    fn audio_starts_on_first_hit_only() {
        let mut session = session();
        let camera = camera();
        let report = session.update(DT, &center_press(), &camera);
        assert!(report.start_audio);
        session.update(DT, &released(), &camera);
        let report = session.update(DT, &center_press(), &camera);
        assert!(!report.start_audio);
    }

    #[test]
    fn dragging_pauses_idle_spin() {
        let mut session = session();
        let camera = camera();
        session.update(DT, &released(), &camera);
        let spun = session.spin;
        assert!(spun > 0.0);

        session.set_dragging(true);
        session.update(DT, &released(), &camera);
        assert_eq!(session.spin, spun);

        session.set_dragging(false);
        session.update(DT, &released(), &camera);
        assert!(session.spin > spun);
    }

    #[test]
    fn rainbow_rate_steps_up_the_ladder() {
        let mut session = session();
        let camera = camera();
        assert_eq!(session.rainbow_rate(), 0.0);

        session.force_score(1000);
        session.update(DT, &released(), &camera);
        assert_eq!(session.rainbow_rate(), 0.3);
        assert!(session.scroll_enabled());

        session.force_score(1500);
        session.update(DT, &released(), &camera);
        assert_eq!(session.rainbow_rate(), 2.0);

        // Re-assigned every frame, still 2.0.
        session.update(DT, &released(), &camera);
        assert_eq!(session.rainbow_rate(), 2.0);
    }

    #[test]
    fn scroll_accumulates_at_the_current_rate() {
        let mut session = session();
        let camera = camera();
        session.force_score(1000);
        session.update(DT, &released(), &camera);
        let first = session.scroll();
        assert!((first - 0.3).abs() < 1e-6);
        session.update(DT, &released(), &camera);
        assert!((session.scroll() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn ladder_unlocks_report_once() {
        let mut session = session();
        let camera = camera();
        session.force_score(250);
        let report = session.update(DT, &released(), &camera);
        assert_eq!(report.unlocked, vec![Effect::Bloom]);
        let report = session.update(DT, &released(), &camera);
        assert!(report.unlocked.is_empty());
    }
}
