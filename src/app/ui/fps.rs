use std::collections::VecDeque;

use eframe::egui::Context;

const FPS_SAMPLE_WINDOW: usize = 180;

pub(in crate::app) struct FpsCounter {
    current: f32,
    samples: VecDeque<f32>,
    pub show_average: bool,
    pub show_low: bool,
    pub show_frame_time: bool,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self {
            current: 0.0,
            samples: VecDeque::with_capacity(FPS_SAMPLE_WINDOW),
            show_average: true,
            show_low: false,
            show_frame_time: true,
        }
    }
}

impl FpsCounter {
    pub(in crate::app) fn update(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt);
        if dt <= f32::EPSILON {
            return;
        }

        self.current = (1.0 / dt).clamp(0.0, 1000.0);
        self.samples.push_back(self.current);
        while self.samples.len() > FPS_SAMPLE_WINDOW {
            self.samples.pop_front();
        }
    }

    pub(in crate::app) fn display_text(&self) -> String {
        let mut parts = vec![format!("FPS {:.0}", self.current)];

        if self.show_average && !self.samples.is_empty() {
            let avg = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
            parts.push(format!("avg {avg:.1}"));
        }

        if self.show_low
            && let Some(low) = self.samples.iter().copied().reduce(f32::min)
        {
            parts.push(format!("low {low:.0}"));
        }

        if self.show_frame_time && self.current > f32::EPSILON {
            parts.push(format!("{:.1} ms", 1000.0 / self.current));
        }

        parts.join(" | ")
    }
}
