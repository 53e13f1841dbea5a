//! Snap relaxed positions onto the integer grid.

use crate::layout::{Layout, Vec2};

/// Truncate every machine position toward zero.
///
/// Positions are non-negative after relaxation, so this is the floor. An
/// already integral layout is left unchanged.
pub fn discretize(layout: &mut Layout) {
    for (_, machine) in layout.machines_mut() {
        machine.position = Vec2::new(machine.position.x.trunc(), machine.position.y.trunc());
    }
    tracing::debug!(machines = layout.machine_count(), "discretized layout");
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorial_core::test_utils::plain_machines;
    use factorial_spatial::{BuildingFootprint, SiteBounds};

    #[test]
    fn truncates_toward_zero() {
        let (_, idle) = plain_machines();
        let mut layout = Layout::new(SiteBounds::default());
        let fp = BuildingFootprint::new(3, 3);
        let a = layout.add_machine(idle, fp, Vec2::new(4.99, 0.5));
        let b = layout.add_machine(idle, fp, Vec2::new(10.0, 7.01));

        discretize(&mut layout);

        assert_eq!(layout.machine(a).unwrap().position, Vec2::new(4.0, 0.0));
        assert_eq!(layout.machine(b).unwrap().position, Vec2::new(10.0, 7.0));
        assert!(layout.is_integral());
    }

    #[test]
    fn second_pass_changes_nothing() {
        let (_, idle) = plain_machines();
        let mut layout = Layout::new(SiteBounds::default());
        let fp = BuildingFootprint::new(3, 3);
        layout.add_machine(idle, fp, Vec2::new(12.75, 33.3));
        layout.add_machine(idle, fp, Vec2::new(0.2, 92.9));

        discretize(&mut layout);
        let once: Vec<_> = layout.machines().map(|(_, m)| m.position).collect();
        discretize(&mut layout);
        let twice: Vec<_> = layout.machines().map(|(_, m)| m.position).collect();

        assert_eq!(once, twice);
    }

    #[test]
    fn connections_survive() {
        let (reg, chain) = factorial_core::test_utils::circuit_chain();
        let fp = BuildingFootprint::new(3, 3);
        let mut layout = Layout::new(SiteBounds::default());
        layout.add_machine(chain.cable_assembler, fp, Vec2::new(1.5, 1.5));
        layout.add_machine(chain.circuit_assembler, fp, Vec2::new(8.5, 1.5));
        crate::resolve::resolve_dependencies(&mut layout, &reg, Default::default()).unwrap();

        discretize(&mut layout);
        assert_eq!(layout.connection_count(), 1);
    }
}
