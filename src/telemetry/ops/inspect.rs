use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Inspect;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Probe, Report }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Probe => "probe",
        Phase::Report => "report",
    }}
    fn span(&self) -> Span { match self {
        Phase::Probe => info_span!("probe"),
        Phase::Report => info_span!("report"),
    }}
}

impl OpMarker for Inspect {
    const NAME: &'static str = "inspect";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("inspect") }
}
