//! One-way progress reporting from the trainer.
//!
//! The trainer never reads anything back from a [`TelemetrySink`]; sinks only
//! observe. Every [`TrainingEvent`] renders as a single human-readable line via
//! `Display`.

use neurodrive_evaluator::policy::InvalidChromosome;

use crate::stats::FitnessStats;

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum TrainingEvent {
    #[display("=== Round {round} ===")]
    GenerationStarted { round: usize, population: usize },
    #[display(
        "Average checkpoint: {average_checkpoint:.2} | reached goal: {goal_count}/{population} | \
         average smallest edge distance: {average_smallest_edge_distance:.2} | fitness: {fitness}"
    )]
    GenerationSummary {
        round: usize,
        average_checkpoint: f32,
        goal_count: usize,
        population: usize,
        /// Averaged over the elites of the generation.
        average_smallest_edge_distance: f32,
        fitness: FitnessStats,
    },
    #[display("New record: max checkpoint {checkpoint}")]
    NewRecord { checkpoint: usize, previous: usize },
    #[display("Plateau detected after {generations} generations: entering hypermutation")]
    HypermutationEntered { generations: usize },
    #[display("Hypermutation active (stuck for {generations} generations)")]
    HypermutationActive { generations: usize },
    #[display("Progress made: hypermutation off")]
    HypermutationLeft,
    #[display("Generation {generation} completed, best fitness {best_fitness:.2}")]
    GenerationCompleted { generation: usize, best_fitness: f32 },
    #[display("Discarded seed for slot {slot}: {reason}")]
    SeedDiscarded {
        slot: usize,
        reason: InvalidChromosome,
    },
}

/// Receives training progress.
pub trait TelemetrySink {
    fn record(&mut self, event: TrainingEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _event: TrainingEvent) {}
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&mut self, event: TrainingEvent) {
        match &event {
            TrainingEvent::SeedDiscarded { .. } => tracing::warn!("{event}"),
            _ => tracing::info!("{event}"),
        }
    }
}

impl TelemetrySink for Vec<TrainingEvent> {
    fn record(&mut self, event: TrainingEvent) {
        self.push(event);
    }
}

impl<S> TelemetrySink for &mut S
where
    S: TelemetrySink + ?Sized,
{
    fn record(&mut self, event: TrainingEvent) {
        (**self).record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_lines() {
        let event = TrainingEvent::GenerationCompleted {
            generation: 3,
            best_fitness: 512.5,
        };
        assert_eq!(event.to_string(), "Generation 3 completed, best fitness 512.50");

        let event = TrainingEvent::HypermutationActive { generations: 7 };
        assert_eq!(event.to_string(), "Hypermutation active (stuck for 7 generations)");
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut events: Vec<TrainingEvent> = vec![];
        let sink: &mut dyn TelemetrySink = &mut events;
        sink.record(TrainingEvent::HypermutationLeft);
        sink.record(TrainingEvent::NewRecord {
            checkpoint: 2,
            previous: 1,
        });
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], TrainingEvent::HypermutationLeft);
    }
}
