use kmu2_core::{Event, Kmu2Error};
use tracing::{info, trace};

use crate::config::SelectionConfig;
use crate::outcome::{SelectionOutcome, StageId, Verdict};
use crate::stages::{
    CalorimeterStage, ChargeStage, DownstreamStage, EventContext, MissingMassStage,
    MomentumStage, ReferenceStage, Stage, TrackMultiplicityStage, TrackQualityStage,
    UpstreamTagStage, UpstreamTimingStage, VertexStage,
};

/// Ordered list of stages built once from a validated configuration.
///
/// The pipeline holds no per-event state; `run` takes `&self`, so one
/// instance can be shared across threads.
pub struct SelectionPipeline {
    config: SelectionConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for SelectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionPipeline")
            .field("stages", &self.stage_ids())
            .finish()
    }
}

impl SelectionPipeline {
    /// Validates the configuration and assembles the stages.
    pub fn new(config: SelectionConfig) -> Result<Self, Kmu2Error> {
        config.validate()?;
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(TrackMultiplicityStage),
            Box::new(ChargeStage::new(config.beam_charge)),
            Box::new(TrackQualityStage::new(config.track.clone())),
            Box::new(UpstreamTagStage::new(&config.upstream)),
            Box::new(VertexStage::new(config.vertex.clone())),
            Box::new(MissingMassStage::new(config.kinematics.clone())),
            Box::new(MomentumStage::new(config.momentum.clone())),
            Box::new(ReferenceStage::new(config.reference.clone())),
            Box::new(UpstreamTimingStage::new(&config.upstream)),
        ];
        for cuts in &config.downstream {
            stages.push(Box::new(DownstreamStage::new(cuts.clone())));
        }
        if !config.calorimeter.is_empty() {
            stages.push(Box::new(CalorimeterStage::new(config.calorimeter.clone())));
        }
        let pipeline = Self { config, stages };
        info!(
            stages = %pipeline
                .stage_ids()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
            "selection pipeline ready"
        );
        Ok(pipeline)
    }

    /// Configuration the pipeline was built from.
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Stage identifiers in evaluation order.
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|stage| stage.id()).collect()
    }

    /// Evaluates one event, stopping at the first failing stage.
    pub fn run(&self, event: &Event) -> SelectionOutcome {
        let mut ctx = EventContext::new(event, &self.config.geometry);
        let verdict = self.stages.iter().try_for_each(|stage| match stage.evaluate(&mut ctx) {
            Verdict::Continue => Ok(()),
            Verdict::Reject(rejection) => Err(rejection),
        });
        match verdict {
            Ok(()) => SelectionOutcome {
                accepted: true,
                rejection: None,
                diagnostics: ctx.diagnostics,
            },
            Err(rejection) => {
                trace!(
                    burst = event.burst_id,
                    stage = %rejection.stage,
                    cut = ?rejection.cut,
                    "event rejected"
                );
                SelectionOutcome {
                    accepted: false,
                    rejection: Some(rejection),
                    diagnostics: ctx.diagnostics,
                }
            }
        }
    }
}
