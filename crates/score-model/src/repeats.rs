use crate::model::{Measure, Part, Score};

impl Score {
    /// Unroll forward/backward repeat barlines into a linear score.
    ///
    /// Volta endings are not interpreted: every pass replays the whole
    /// repeated section. Measures are renumbered and re-offset so absolute
    /// time stays monotonic.
    pub fn expand_repeats(&self) -> Score {
        let parts = self.parts().iter().map(expand_part).collect();
        self.clone().replace_parts(parts)
    }
}

/// Measure indices in playback order.
fn playback_order(measures: &[Measure]) -> Vec<usize> {
    let mut order = Vec::with_capacity(measures.len());
    let mut section_start = 0;
    for (index, measure) in measures.iter().enumerate() {
        if measure.repeat_start {
            section_start = index;
        }
        order.push(index);
        if let Some(times) = measure.repeat_end {
            for _ in 1..times {
                order.extend(section_start..=index);
            }
            section_start = index + 1;
        }
    }
    order
}

fn expand_part(part: &Part) -> Part {
    let order = playback_order(&part.measures);
    if order.len() == part.measures.len() {
        return part.clone();
    }
    tracing::debug!(part = %part.id, from = part.measures.len(), to = order.len(), "expanded repeats");

    let mut offset = 0.0;
    let measures = order
        .into_iter()
        .enumerate()
        .map(|(position, index)| {
            let source = &part.measures[index];
            let measure = Measure::new(position as u32 + 1, offset, source.duration)
                .with_events(source.events.clone());
            offset += source.duration;
            measure
        })
        .collect();

    Part {
        measures,
        ..part.clone()
    }
}
