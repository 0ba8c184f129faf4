//! Engine facade: compute once, reorder and recolor cheaply
//!
//! Holds only numeric state. A controller reacting to dataset events calls
//! `rebuild`, `reorder` and `recolor`; presentation code reads the outputs.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::colormap::{DegenerateRangePolicy, Rgba};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::fingerprint::fingerprint;
use crate::matrix::{self, DistanceMatrix};
use crate::measure::DistanceMeasure;
use crate::overlay::{self, ClusterColors, ClusterMembership};
use crate::render::{self, ColorIndexImage, Order, RgbImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebuild {
    /// Same features and measure as the current matrix; nothing recomputed.
    Reused,
    Built,
}

/// Inputs for one render, detached from the engine so it can run elsewhere.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub generation: u64,
    matrix: Arc<DistanceMatrix>,
    order: Order,
    policy: DegenerateRangePolicy,
}

impl RenderJob {
    pub fn run(&self) -> Result<ColorIndexImage> {
        render::render(&self.matrix, &self.order, self.policy)
    }
}

pub struct Engine {
    config: EngineConfig,
    pool: ThreadPool,
    matrix: Option<Arc<DistanceMatrix>>,
    fingerprint: Option<String>,
    order: Order,
    memberships: Option<ClusterMembership>,
    colors: ClusterColors,
    generation: u64,
    image: Option<ColorIndexImage>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("distmat-{i}"));
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        Ok(Self {
            colors: ClusterColors::new(config.ambiguous_color),
            config,
            pool,
            matrix: None,
            fingerprint: None,
            order: Order::identity(0),
            memberships: None,
            generation: 0,
            image: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn matrix(&self) -> Option<&DistanceMatrix> {
        self.matrix.as_deref()
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Bumped whenever the displayed image would change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cluster_colors_mut(&mut self) -> &mut ClusterColors {
        &mut self.colors
    }

    /// Recompute the distance matrix unless `features` and `measure` match
    /// the current one. On failure the previous matrix stays in place.
    pub fn rebuild(&mut self, features: &[Vec<f32>], measure: DistanceMeasure) -> Result<Rebuild> {
        let fp = fingerprint(features, measure);
        if self.matrix.is_some() && self.fingerprint.as_deref() == Some(fp.as_str()) {
            debug!(fingerprint = %fp, "feature set unchanged, reusing matrix");
            return Ok(Rebuild::Reused);
        }

        let built = self.pool.install(|| matrix::build(features, measure))?;
        let n = built.len();
        if self.order.len() != n {
            self.order = Order::identity(n);
        }
        if self.memberships.as_ref().is_some_and(|m| m.len() != n) {
            self.memberships = None;
        }
        self.matrix = Some(Arc::new(built));
        self.fingerprint = Some(fp);
        self.invalidate();
        Ok(Rebuild::Built)
    }

    /// Replace the display order. The matrix is untouched.
    pub fn reorder(&mut self, order: Vec<usize>) -> Result<()> {
        let n = self.current()?.len();
        self.order = Order::new(order, n)?;
        self.invalidate();
        Ok(())
    }

    /// Replace cluster memberships; only the strip changes.
    pub fn recolor(&mut self, memberships: ClusterMembership) -> Result<()> {
        let n = self.current()?.len();
        if memberships.len() != n {
            return Err(EngineError::LengthMismatch {
                what: "cluster membership",
                expected: n,
                found: memberships.len(),
            });
        }
        self.memberships = Some(memberships);
        Ok(())
    }

    /// Current image, rendered on first request after a change.
    pub fn image(&mut self) -> Result<&ColorIndexImage> {
        if self.image.is_none() {
            let job = self.snapshot()?;
            let image = self.pool.install(|| job.run())?;
            self.image = Some(image);
        }
        self.image.as_ref().ok_or(EngineError::NoMatrix)
    }

    pub fn rgb_image(&mut self) -> Result<RgbImage> {
        let colormap = self.config.palette.colormap();
        let image = self.image()?;
        Ok(image.to_rgb(colormap))
    }

    /// Detach the inputs of the current image.
    pub fn snapshot(&self) -> Result<RenderJob> {
        Ok(RenderJob {
            generation: self.generation,
            matrix: Arc::clone(self.current()?),
            order: self.order.clone(),
            policy: self.config.degenerate_range,
        })
    }

    /// Keep an externally rendered image only if nothing changed since its
    /// snapshot. Returns whether it was retained.
    pub fn accept(&mut self, generation: u64, image: ColorIndexImage) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding superseded image");
            return false;
        }
        self.image = Some(image);
        true
    }

    pub fn cluster_strip(&self) -> Result<Vec<Rgba>> {
        let n = self.current()?.len();
        match &self.memberships {
            Some(m) => overlay::cluster_strip(m, &self.order, &self.colors),
            None => Ok(vec![Rgba::TRANSPARENT; n]),
        }
    }

    /// Raw distance under displayed coordinates.
    pub fn value_at(&self, y: usize, x: usize) -> Result<f32> {
        render::value_at(self.current()?, &self.order, y, x)
    }

    fn current(&self) -> Result<&Arc<DistanceMatrix>> {
        self.matrix.as_ref().ok_or(EngineError::NoMatrix)
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.image = None;
    }
}
