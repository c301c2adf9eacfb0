// src/sweep.rs
//
// Curvature-radius sweep.
//
// The source field, aperture and flat-face control (Rc = ∞ through the same
// aperture stop) are built once from the
// immutable configuration. Each curvature radius is then an independent
// phase-screen -> propagate -> analyze pass, so the whole sweep is a pure map
// over the radii. `run_sweep` evaluates that map with rayon; `Sweep` drives the
// same map one sample at a time (Idle -> Running(i) -> Done).
//
// A radius that fails validation is recorded as a failed sample and the sweep
// continues.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::analysis::{analyze, divergence_angle, BeamMetrics};
use crate::complex_field::ComplexField;
use crate::error::{ConfigurationError, SamplingWarning};
use crate::params::{PropagationMethod, SimConfig};
use crate::phase_screen::{apply_concave_cap, ApertureSpec};
use crate::propagation::propagate;
use crate::source::init_fiber_mode;

/// Metrics of one curvature radius. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Curvature radius (m); +∞ for the flat face.
    pub curvature_radius: f64,
    pub metrics: BeamMetrics,
    /// Half-angle divergence from input to output width (rad).
    pub divergence_angle: Option<f64>,
    /// Divergence in excess of the flat-face control (rad).
    pub excess_divergence: Option<f64>,
    pub method: PropagationMethod,
    /// Pitch of the output plane (m).
    pub output_pitch: f64,
    pub warnings: Vec<SamplingWarning>,
    /// Output field, kept only for the inspected radius.
    pub field: Option<ComplexField>,
}

impl SimulationResult {
    /// 1/e² full width (m), `None` if saturated.
    pub fn width(&self) -> Option<f64> {
        self.metrics.width
    }

    pub fn is_saturated(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, SamplingWarning::BeamExceedsWindow))
    }
}

/// One entry of the sweep, in sweep order.
#[derive(Debug, Clone)]
pub struct SweepSample {
    pub curvature_radius: f64,
    pub outcome: Result<SimulationResult, ConfigurationError>,
}

/// Flat end face (Rc = ∞) behind the same aperture stop, propagated the same
/// distance. Excess divergence of every sample is measured against it.
#[derive(Debug, Clone)]
pub struct FlatControl {
    pub metrics: BeamMetrics,
    /// 1/e² width of the bare fibre output (no aperture stop), for reference.
    pub bare_width: Option<f64>,
    pub divergence_angle: Option<f64>,
    pub warnings: Vec<SamplingWarning>,
    pub field: ComplexField,
}

/// Everything shared by all sweep samples.
#[derive(Debug, Clone)]
pub struct SweepContext {
    pub config: SimConfig,
    pub source: ComplexField,
    pub aperture: ApertureSpec,
    /// 1/e² full width of the source (m).
    pub input_width: Option<f64>,
    pub flat: FlatControl,
}

impl SweepContext {
    /// Validate the configuration and build the radius-independent pieces.
    pub fn prepare(config: &SimConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let source = init_fiber_mode(&config.fiber, &config.grid, config.profile)?;
        let aperture = ApertureSpec::from_core(config.fiber.core_radius, config.aperture_factor);
        let input_width = analyze(&source).width;

        let flat_face = apply_concave_cap(&source, f64::INFINITY, &aperture, config.sag)?;
        let flat_prop = propagate(&flat_face.field, config.distance, config.method)?;
        let mut warnings = flat_face.warnings;
        warnings.extend(flat_prop.warnings);
        let metrics = analyze(&flat_prop.field);
        if metrics.width.is_none() {
            warnings.push(SamplingWarning::BeamExceedsWindow);
        }
        let flat_divergence = match (input_width, metrics.width) {
            (Some(w_in), Some(w_out)) => Some(divergence_angle(w_in, w_out, config.distance)),
            _ => None,
        };
        for w in &warnings {
            warn!(sample = "flat", "{}", w);
        }

        let bare = propagate(&source, config.distance, config.method)?;
        let bare_width = analyze(&bare.field).width;

        info!(
            n = config.grid.n,
            method = flat_prop.method.as_str(),
            flat_width_um = metrics.width.map(|w| w * 1e6),
            bare_width_um = bare_width.map(|w| w * 1e6),
            "prepared sweep context"
        );

        Ok(Self {
            config: config.clone(),
            source,
            aperture,
            input_width,
            flat: FlatControl {
                metrics,
                bare_width,
                divergence_angle: flat_divergence,
                warnings,
                field: flat_prop.field,
            },
        })
    }

    fn is_inspected(&self, rc: f64) -> bool {
        match self.config.inspect_radius {
            Some(r) if rc.is_finite() => (r - rc).abs() <= 1e-9 * r.abs().max(rc.abs()),
            Some(_) => false,
            None => false,
        }
    }

    /// Phase screen, propagation and analysis for one curvature radius.
    pub fn simulate(&self, rc: f64) -> Result<SimulationResult, ConfigurationError> {
        let cfg = &self.config;

        let screened = apply_concave_cap(&self.source, rc, &self.aperture, cfg.sag)?;
        let mut warnings = screened.warnings;

        let prop = propagate(&screened.field, cfg.distance, cfg.method)?;
        warnings.extend(prop.warnings);

        let metrics = analyze(&prop.field);
        if metrics.width.is_none() {
            warnings.push(SamplingWarning::BeamExceedsWindow);
        }

        let div = match (self.input_width, metrics.width) {
            (Some(w_in), Some(w_out)) => Some(divergence_angle(w_in, w_out, cfg.distance)),
            _ => None,
        };
        let excess = match (div, self.flat.divergence_angle) {
            (Some(d), Some(f)) => Some(d - f),
            _ => None,
        };

        let field = if self.is_inspected(rc) {
            Some(prop.field.clone())
        } else {
            None
        };

        Ok(SimulationResult {
            curvature_radius: rc,
            metrics,
            divergence_angle: div,
            excess_divergence: excess,
            method: prop.method,
            output_pitch: prop.field.grid.dx,
            warnings,
            field,
        })
    }

    fn sample(&self, rc: f64) -> SweepSample {
        let outcome = self.simulate(rc);
        match &outcome {
            Ok(r) => {
                info!(
                    rc_um = rc * 1e6,
                    width_um = r.width().map(|w| w * 1e6),
                    "sample done"
                );
                for w in &r.warnings {
                    warn!(rc_um = rc * 1e6, "{}", w);
                }
            }
            Err(e) => warn!(rc_um = rc * 1e6, "sample skipped: {}", e),
        }
        SweepSample {
            curvature_radius: rc,
            outcome,
        }
    }
}

/// Trend of divergence against 1/Rc over the completed samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Divergence never decreases as 1/Rc grows.
    MonotonicNonDecreasing,
    NotMonotonic,
    /// Fewer than two samples with a valid width.
    Insufficient,
}

/// All sweep output, handed to reporting and plotting.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub config: SimConfig,
    pub input_width: Option<f64>,
    pub flat: FlatControl,
    /// Ascending curvature radius.
    pub samples: Vec<SweepSample>,
}

impl SweepReport {
    pub fn completed(&self) -> impl Iterator<Item = &SimulationResult> {
        self.samples.iter().filter_map(|s| s.outcome.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (f64, &ConfigurationError)> {
        self.samples
            .iter()
            .filter_map(|s| s.outcome.as_ref().err().map(|e| (s.curvature_radius, e)))
    }

    /// The kept output field for the inspected radius, if it completed.
    pub fn inspected(&self) -> Option<&SimulationResult> {
        self.completed().find(|r| r.field.is_some())
    }

    pub fn trend(&self) -> Trend {
        // Ascending Rc is descending 1/Rc, so widths must be non-increasing.
        let widths: Vec<f64> = self.completed().filter_map(|r| r.width()).collect();
        if widths.len() < 2 {
            return Trend::Insufficient;
        }
        if widths.windows(2).all(|w| w[1] <= w[0]) {
            Trend::MonotonicNonDecreasing
        } else {
            Trend::NotMonotonic
        }
    }
}

/// Sweep state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Idle,
    Running(usize),
    Done,
}

/// Sequential sweep driver.
pub struct Sweep {
    ctx: SweepContext,
    radii: Vec<f64>,
    samples: Vec<SweepSample>,
    state: SweepState,
}

impl Sweep {
    pub fn new(config: &SimConfig) -> Result<Self, ConfigurationError> {
        let ctx = SweepContext::prepare(config)?;
        let radii = config.sweep.radii();
        Ok(Self {
            ctx,
            radii,
            samples: Vec::new(),
            state: SweepState::Idle,
        })
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.radii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }

    /// Run the next sample. Returns `None` once every radius has been processed.
    pub fn step(&mut self) -> Option<&SweepSample> {
        let i = match self.state {
            SweepState::Idle => 0,
            SweepState::Running(i) => i + 1,
            SweepState::Done => return None,
        };
        if i >= self.radii.len() {
            self.state = SweepState::Done;
            return None;
        }
        self.state = SweepState::Running(i);
        let sample = self.ctx.sample(self.radii[i]);
        self.samples.push(sample);
        self.samples.last()
    }

    /// Process remaining samples and hand over the ordered results.
    pub fn finish(mut self) -> SweepReport {
        while self.step().is_some() {}
        SweepReport {
            config: self.ctx.config,
            input_width: self.ctx.input_width,
            flat: self.ctx.flat,
            samples: self.samples,
        }
    }
}

/// Evaluate the whole sweep as a parallel map over curvature radii.
pub fn run_sweep(config: &SimConfig) -> Result<SweepReport, ConfigurationError> {
    let ctx = SweepContext::prepare(config)?;
    let radii = config.sweep.radii();
    info!(samples = radii.len(), "running curvature sweep");

    let samples: Vec<SweepSample> = radii.par_iter().map(|&rc| ctx.sample(rc)).collect();

    Ok(SweepReport {
        config: ctx.config,
        input_width: ctx.input_width,
        flat: ctx.flat,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{GridParams, SweepSpec};

    fn small_config(values: Vec<f64>) -> SimConfig {
        SimConfig {
            grid: GridParams {
                n: 128,
                window: 100e-6,
            },
            sweep: SweepSpec::List { values },
            inspect_radius: Some(50e-6),
            ..SimConfig::default()
        }
    }

    #[test]
    fn state_machine_walks_every_sample_then_stops() {
        let cfg = small_config(vec![50e-6, 200e-6]);
        let mut sweep = Sweep::new(&cfg).unwrap();
        assert_eq!(sweep.state(), SweepState::Idle);
        assert_eq!(sweep.len(), 2);

        assert!(sweep.step().is_some());
        assert_eq!(sweep.state(), SweepState::Running(0));
        assert!(sweep.step().is_some());
        assert_eq!(sweep.state(), SweepState::Running(1));
        assert!(sweep.step().is_none());
        assert_eq!(sweep.state(), SweepState::Done);
        assert!(sweep.step().is_none());

        let report = sweep.finish();
        assert_eq!(report.samples.len(), 2);
    }

    #[test]
    fn bad_radius_is_skipped_not_fatal() {
        let cfg = small_config(vec![0.0, 50e-6, 100e-6]);
        let report = run_sweep(&cfg).unwrap();
        assert_eq!(report.samples.len(), 3);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(*failed[0].1, ConfigurationError::ZeroCurvatureRadius);
        assert_eq!(report.completed().count(), 2);
    }

    #[test]
    fn sweep_keeps_ascending_order_and_inspected_field() {
        let cfg = small_config(vec![200e-6, 50e-6, 100e-6]);
        let report = run_sweep(&cfg).unwrap();
        let radii: Vec<f64> = report.samples.iter().map(|s| s.curvature_radius).collect();
        assert_eq!(radii, vec![50e-6, 100e-6, 200e-6]);
        let inspected = report.inspected().unwrap();
        assert_eq!(inspected.curvature_radius, 50e-6);
        assert_eq!(report.completed().filter(|r| r.field.is_some()).count(), 1);
    }

    #[test]
    fn parallel_and_sequential_sweeps_agree() {
        let cfg = small_config(vec![30e-6, 100e-6]);
        let par = run_sweep(&cfg).unwrap();
        let seq = Sweep::new(&cfg).unwrap().finish();
        for (a, b) in par.completed().zip(seq.completed()) {
            assert_eq!(a.curvature_radius, b.curvature_radius);
            assert_eq!(a.width(), b.width());
            assert_eq!(a.metrics.peak_intensity, b.metrics.peak_intensity);
        }
    }

    #[test]
    fn flat_radius_sample_matches_the_control() {
        let cfg = small_config(vec![f64::INFINITY, 100e-6]);
        let report = run_sweep(&cfg).unwrap();
        let flat = report
            .completed()
            .find(|r| r.curvature_radius.is_infinite())
            .unwrap();
        assert_eq!(flat.width(), report.flat.metrics.width);
        assert_eq!(flat.excess_divergence, Some(0.0));
        assert!(flat.field.is_none());

        // The aperture stop alone broadens the beam relative to the bare fibre.
        assert!(report.flat.metrics.width.unwrap() > report.flat.bare_width.unwrap());
    }

    #[test]
    fn invalid_static_config_fails_before_sweep() {
        let mut cfg = small_config(vec![50e-6]);
        cfg.fiber.core_radius = 80e-6;
        assert!(matches!(
            run_sweep(&cfg),
            Err(ConfigurationError::ModeExceedsWindow { .. })
        ));
    }
}
