//! The end-to-end driver: random placement, dependency resolution,
//! relaxation, discretization, routing and emission, in that order.

use crate::config::LayoutConfig;
use crate::discretize::discretize;
use crate::error::LayoutError;
use crate::layout::Layout;
use crate::model::ProductionModel;
use crate::relax::{RelaxReport, relax};
use crate::resolve::{ExternalInput, resolve_dependencies};
use crate::route::{RoutedPath, Router};
use factorial_core::id::MachineTypeId;
use factorial_core::rng::SimRng;
use factorial_spatial::{Site, SiteSink};

/// Everything a successful run produced besides the site placements.
#[derive(Debug, Clone)]
pub struct LayoutOutcome {
    /// The final, integral layout with every connection's path recorded.
    pub layout: Layout,
    /// Inputs no machine in the layout produces.
    pub external_inputs: Vec<ExternalInput>,
    pub relax: RelaxReport,
    pub routes: Vec<RoutedPath>,
    /// Seed of the attempt that succeeded.
    pub seed: u64,
}

/// Lays out a list of machines and emits the result to a site.
#[derive(Debug, Clone, Default)]
pub struct LayoutPipeline {
    config: LayoutConfig,
}

impl LayoutPipeline {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// An empty [`Site`] sized to the config, with the footprint of every
    /// machine entity in `machines` registered.
    pub fn prepare_site<M: ProductionModel>(
        &self,
        model: &M,
        machines: &[MachineTypeId],
    ) -> Result<Site, LayoutError> {
        let mut site = Site::new(self.config.site);
        for &machine in machines {
            let footprint = model
                .footprint(machine)
                .ok_or(LayoutError::UnknownMachineType(machine))?;
            let name = model
                .entity_name(machine)
                .ok_or(LayoutError::UnknownMachineType(machine))?;
            site.register_footprint(name, footprint);
        }
        Ok(site)
    }

    /// Run every stage and emit machines, then transport, to `sink`.
    ///
    /// Relaxation that fails to converge is retried with the next seed up to
    /// `restarts` times. Nothing reaches the sink unless every connection
    /// routes.
    pub fn run<M, S>(
        &self,
        model: &M,
        machines: &[MachineTypeId],
        sink: &mut S,
    ) -> Result<LayoutOutcome, LayoutError>
    where
        M: ProductionModel,
        S: SiteSink + ?Sized,
    {
        let (mut layout, external_inputs, relax_report, seed) = self.settle(model, machines)?;
        discretize(&mut layout);

        let router = Router::new(&self.config.router);
        let routes = router.plan(&layout)?;

        for (_, machine) in layout.machines() {
            let name = model
                .entity_name(machine.machine_type)
                .ok_or(LayoutError::UnknownMachineType(machine.machine_type))?;
            sink.add_entity(
                name,
                machine.grid_position(),
                0,
                model.recipe(machine.machine_type),
            )?;
        }
        let transport = router.emit(&routes, sink)?;

        for route in &routes {
            if let Some(conn) = layout.connection_mut(route.connection) {
                conn.path = Some(route.cells.clone());
            }
        }

        tracing::info!(
            machines = layout.machine_count(),
            connections = layout.connection_count(),
            transport,
            external_inputs = external_inputs.len(),
            iterations = relax_report.iterations,
            seed,
            "layout complete"
        );
        Ok(LayoutOutcome {
            layout,
            external_inputs,
            relax: relax_report,
            routes,
            seed,
        })
    }

    /// Place, resolve and relax, restarting on non-convergence.
    fn settle<M: ProductionModel>(
        &self,
        model: &M,
        machines: &[MachineTypeId],
    ) -> Result<(Layout, Vec<ExternalInput>, RelaxReport, u64), LayoutError> {
        let mut attempt = 0;
        loop {
            let seed = self.config.seed.wrapping_add(attempt as u64);
            let mut rng = SimRng::new(seed);
            let mut layout =
                Layout::random(model, machines.iter().copied(), self.config.site, &mut rng)?;
            let resolved = resolve_dependencies(&mut layout, model, self.config.producer_policy)?;

            match relax(&mut layout, &self.config.relax) {
                Ok(report) => return Ok((layout, resolved.external_inputs, report, seed)),
                Err(err) if err.is_retryable() && attempt < self.config.restarts => {
                    tracing::warn!(seed, attempt, error = %err, "restarting from a new placement");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
