use facet::Facet;

/// Overlay animation speed. Advisory: read by overlay listeners only.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum AnimationSpeed {
    Slow,
    #[default]
    Fast,
    Off,
}

/// Flat options record read at the boundary.
///
/// Classification never interprets these; listeners and the hub's
/// registration path do.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct Options {
    /// Initial active/paused state of new instrumentation instances.
    pub enabled: bool,
    /// Include children of an explicitly scanned component.
    pub include_children: bool,
    /// Start even when the host reports a production renderer.
    pub dangerously_force_run_in_production: bool,
    pub play_sound: bool,
    /// Log renders through the console reporter.
    pub log: bool,
    pub show_toolbar: bool,
    /// Only report components that rendered at least this many times.
    pub render_count_threshold: u64,
    /// Clear overlay render counts after this long without renders.
    pub reset_count_timeout_ms: u64,
    /// Maintain the per-component-name report table.
    pub report: bool,
    pub always_show_labels: bool,
    pub animation_speed: AnimationSpeed,
    /// Run the necessity classifier on one render in `sample_rate`.
    /// Zero disables it entirely.
    pub sample_rate: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            enabled: true,
            include_children: true,
            dangerously_force_run_in_production: false,
            play_sound: true,
            log: false,
            show_toolbar: true,
            render_count_threshold: 0,
            reset_count_timeout_ms: 5_000,
            report: false,
            always_show_labels: false,
            animation_speed: AnimationSpeed::Fast,
            sample_rate: 20,
        }
    }
}

impl Options {
    /// Overlay every field the patch sets.
    pub fn apply(&mut self, patch: &OptionsPatch) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = patch.$field {
                    self.$field = value;
                })*
            };
        }
        take!(
            enabled,
            include_children,
            dangerously_force_run_in_production,
            play_sound,
            log,
            show_toolbar,
            render_count_threshold,
            reset_count_timeout_ms,
            report,
            always_show_labels,
            animation_speed,
            sample_rate,
        );
    }
}

/// Partial options, as found in a config file.
#[derive(Facet, Debug, Clone, Default, PartialEq)]
pub struct OptionsPatch {
    #[facet(default)]
    pub enabled: Option<bool>,
    #[facet(default)]
    pub include_children: Option<bool>,
    #[facet(default)]
    pub dangerously_force_run_in_production: Option<bool>,
    #[facet(default)]
    pub play_sound: Option<bool>,
    #[facet(default)]
    pub log: Option<bool>,
    #[facet(default)]
    pub show_toolbar: Option<bool>,
    #[facet(default)]
    pub render_count_threshold: Option<u64>,
    #[facet(default)]
    pub reset_count_timeout_ms: Option<u64>,
    #[facet(default)]
    pub report: Option<bool>,
    #[facet(default)]
    pub always_show_labels: Option<bool>,
    #[facet(default)]
    pub animation_speed: Option<AnimationSpeed>,
    #[facet(default)]
    pub sample_rate: Option<u32>,
}
