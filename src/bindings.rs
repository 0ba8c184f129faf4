//! Python Bindings for the Distance Matrix Engine

use std::collections::BTreeSet;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::EngineConfig;
use crate::engine::{Engine, Rebuild};
use crate::error::EngineError;
use crate::measure::DistanceMeasure;
use crate::overlay::{ClusterColors, ClusterId, ClusterMembership};
use crate::render::Order;

impl From<EngineError> for PyErr {
    fn from(err: EngineError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn parse_measure(name: &str) -> PyResult<DistanceMeasure> {
    DistanceMeasure::from_name(name)
        .ok_or_else(|| PyValueError::new_err(format!("unknown measure '{name}'")))
}

fn rgba_tuples(strip: Vec<crate::colormap::Rgba>) -> Vec<(u8, u8, u8, u8)> {
    strip.into_iter().map(|c| (c.r, c.g, c.b, c.a)).collect()
}

// ============================================================================
// ONE-SHOT FUNCTIONS
// ============================================================================

/// Full symmetric distance matrix as nested lists
#[pyfunction]
fn distance_matrix(vectors: Vec<Vec<f32>>, measure: &str) -> PyResult<Vec<Vec<f32>>> {
    let m = crate::matrix::build(&vectors, parse_measure(measure)?)?;
    Ok(m.to_rows())
}

/// Magma RGB bytes (N*N*3) of the matrix under `order` (identity if None)
#[pyfunction]
fn render_matrix(vectors: Vec<Vec<f32>>, measure: &str, order: Option<Vec<usize>>) -> PyResult<Vec<u8>> {
    let m = crate::matrix::build(&vectors, parse_measure(measure)?)?;
    let order = match order {
        Some(o) => Order::new(o, m.len())?,
        None => Order::identity(m.len()),
    };
    let config = EngineConfig::default();
    let image = crate::render::render(&m, &order, config.degenerate_range)?;
    Ok(image.to_rgb(config.palette.colormap()).data)
}

/// RGBA strip for per-entity cluster id lists under `order`
#[pyfunction]
fn cluster_strip(memberships: Vec<Vec<ClusterId>>, order: Vec<usize>) -> PyResult<Vec<(u8, u8, u8, u8)>> {
    let n = memberships.len();
    let m = ClusterMembership::new(memberships.into_iter().map(BTreeSet::from_iter).collect());
    let strip = crate::overlay::cluster_strip(&m, &Order::new(order, n)?, &ClusterColors::default())?;
    Ok(rgba_tuples(strip))
}

// ============================================================================
// STATEFUL ENGINE
// ============================================================================

#[pyclass(name = "MatrixEngine")]
struct PyEngine {
    inner: Engine,
}

#[pymethods]
impl PyEngine {
    #[new]
    #[pyo3(signature = (threads=None))]
    fn new(threads: Option<usize>) -> PyResult<Self> {
        let config = EngineConfig {
            threads,
            ..EngineConfig::default()
        };
        Ok(Self {
            inner: Engine::new(config)?,
        })
    }

    /// Returns True if the matrix was recomputed
    fn rebuild(&mut self, py: Python<'_>, vectors: Vec<Vec<f32>>, measure: &str) -> PyResult<bool> {
        let measure = parse_measure(measure)?;
        let inner = &mut self.inner;
        let outcome = py.allow_threads(|| inner.rebuild(&vectors, measure))?;
        Ok(outcome == Rebuild::Built)
    }

    fn reorder(&mut self, order: Vec<usize>) -> PyResult<()> {
        Ok(self.inner.reorder(order)?)
    }

    fn recolor(&mut self, memberships: Vec<Vec<ClusterId>>) -> PyResult<()> {
        let m = ClusterMembership::new(memberships.into_iter().map(BTreeSet::from_iter).collect());
        Ok(self.inner.recolor(m)?)
    }

    fn rgb_image(&mut self) -> PyResult<Vec<u8>> {
        Ok(self.inner.rgb_image()?.data)
    }

    fn cluster_strip(&self) -> PyResult<Vec<(u8, u8, u8, u8)>> {
        Ok(rgba_tuples(self.inner.cluster_strip()?))
    }

    fn value_at(&self, y: usize, x: usize) -> PyResult<f32> {
        Ok(self.inner.value_at(y, x)?)
    }

    fn size(&self) -> usize {
        self.inner.matrix().map_or(0, |m| m.len())
    }
}

// ============================================================================
// MODULE EXPORT
// ============================================================================

#[pymodule]
fn distmat_kernel(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(distance_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(render_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(cluster_strip, m)?)?;
    m.add_class::<PyEngine>()?;
    Ok(())
}
