use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Extract;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Page, Probe, Build, Images, WriteRecord }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Page => "page",
        Phase::Probe => "probe",
        Phase::Build => "build",
        Phase::Images => "images",
        Phase::WriteRecord => "write_record",
    }}
    fn span(&self) -> Span { match self {
        Phase::Page => info_span!("page"),
        Phase::Probe => info_span!("probe"),
        Phase::Build => info_span!("build"),
        Phase::Images => info_span!("images"),
        Phase::WriteRecord => info_span!("write_record"),
    }}
}

impl OpMarker for Extract {
    const NAME: &'static str = "extract";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("extract") }
}
