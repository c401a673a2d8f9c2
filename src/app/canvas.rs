use eframe::egui::{self, Align2, Color32, FontId, PointerButton, Sense, Stroke, Ui, vec2};
use graph_lens::render::Frame;
use graph_lens::{Intent, Viewport};

use super::Workbench;
use super::render_utils::{blend_color, draw_background, edge_visible, rgb_color, with_opacity};

const FIT_PADDING: f32 = 40.0;
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const HOVER_COLOR: Color32 = Color32::from_rgb(255, 164, 101);
const HIGHLIGHT_EDGE_COLOR: Color32 = Color32::from_rgb(241, 146, 94);

impl Workbench {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        self.view.set_viewport(Viewport::from_rect(rect));

        if self.fit_requested && self.view.simulation().is_some() {
            self.view.fit_to_view(FIT_PADDING);
            self.fit_requested = false;
        }

        let transform = self.view.interaction().transform;
        draw_background(&painter, rect, transform.pan, transform.zoom);

        self.handle_pointer(ui, rect, &response);

        let mut moving = self.view.interaction().dragging().is_some();
        if self.live_physics {
            let delta_seconds = ui.ctx().input(|input| input.stable_dt);
            moving |= self.view.advance(delta_seconds);
        }
        if moving {
            ui.ctx().request_repaint();
        }

        if self.show_quadtree_overlay {
            self.draw_quadtree_overlay(&painter);
        }

        let frame = self.view.frame();
        self.paint_frame(&painter, rect, &frame);

        if self.view.interaction().hovered().is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }
    }

    fn handle_pointer(&mut self, ui: &Ui, rect: egui::Rect, response: &egui::Response) {
        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                let anchor = ui
                    .input(|input| input.pointer.hover_pos())
                    .unwrap_or_else(|| rect.center());
                let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
                self.view.dispatch(Intent::Zoom { anchor, factor });
            }
        }

        if response.dragged_by(PointerButton::Secondary) || response.dragged_by(PointerButton::Middle) {
            self.view.dispatch(Intent::Pan {
                delta: response.drag_delta(),
            });
        }

        if response.drag_started_by(PointerButton::Primary) {
            let origin = ui.input(|input| input.pointer.press_origin());
            if let Some(pointer) = origin
                && let Some(node_id) = self.view.node_at(pointer).map(str::to_owned)
            {
                self.view.dispatch(Intent::DragStart { node_id, pointer });
            }
        }

        if response.dragged_by(PointerButton::Primary) {
            match response.interact_pointer_pos() {
                Some(pointer) if self.view.interaction().dragging().is_some() => {
                    self.view.dispatch(Intent::DragMove { pointer });
                }
                _ => self.view.dispatch(Intent::Pan {
                    delta: response.drag_delta(),
                }),
            }
        }

        if response.drag_stopped() && self.view.interaction().dragging().is_some() {
            self.view.dispatch(Intent::DragEnd);
        }

        let hovered = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| self.view.node_at(pointer))
            .map(str::to_owned);
        if hovered.as_deref() != self.view.interaction().hovered() {
            self.view.dispatch(Intent::Hover(hovered));
        }

        if response.clicked_by(PointerButton::Primary) {
            let selected = response
                .interact_pointer_pos()
                .and_then(|pointer| self.view.node_at(pointer))
                .map(str::to_owned);
            self.view.dispatch(Intent::Select(selected));
        }
    }

    fn draw_quadtree_overlay(&self, painter: &egui::Painter) {
        let Some(simulation) = self.view.simulation() else {
            return;
        };
        let transform = self.view.interaction().transform;
        let viewport = self.view.viewport();

        for cell in simulation.quadtree_cells() {
            let extent = vec2(cell.half_extent, cell.half_extent);
            let min = transform.world_to_screen(viewport, cell.center - extent);
            let max = transform.world_to_screen(viewport, cell.center + extent);

            let alpha = if cell.is_leaf { 110 } else { 55 };
            let line_width = (1.4_f32 - (cell.depth as f32 * 0.09)).clamp(0.45, 1.4);
            painter.rect_stroke(
                egui::Rect::from_two_pos(min, max),
                0.0,
                Stroke::new(line_width, Color32::from_rgba_unmultiplied(106, 198, 255, alpha)),
                egui::StrokeKind::Middle,
            );
        }
    }

    fn paint_frame(&mut self, painter: &egui::Painter, rect: egui::Rect, frame: &Frame) {
        for region in &frame.regions {
            painter.rect_filled(region.rect, 8.0, rgb_color(region.color, 0.08));
            painter.rect_stroke(
                region.rect,
                8.0,
                Stroke::new(1.0, rgb_color(region.color, 0.45)),
                egui::StrokeKind::Outside,
            );
            painter.text(
                region.rect.left_top() + vec2(6.0, 4.0),
                Align2::LEFT_TOP,
                region.label.as_str(),
                FontId::proportional(11.0),
                rgb_color(region.color, 0.9),
            );
        }

        for path in &frame.paths {
            painter.add(egui::Shape::line(
                path.points.clone(),
                Stroke::new(2.4, Color32::from_rgba_unmultiplied(246, 206, 104, 150)),
            ));
        }

        let mut visible_edges = 0;
        for edge in &frame.edges {
            if !edge_visible(rect, edge.from, edge.to, 2.5) {
                continue;
            }
            visible_edges += 1;

            let base = if edge.highlighted {
                HIGHLIGHT_EDGE_COLOR
            } else {
                Color32::from_rgba_unmultiplied(120, 128, 140, 200)
            };
            painter.line_segment(
                [edge.from, edge.to],
                Stroke::new(edge.width, with_opacity(base, edge.opacity)),
            );

            if let Some(label) = &edge.label {
                painter.text(
                    edge.from + (edge.to - edge.from) * 0.5,
                    Align2::CENTER_CENTER,
                    label.as_str(),
                    FontId::proportional(10.0),
                    with_opacity(Color32::from_gray(200), edge.opacity),
                );
            }
        }
        self.visible_edge_count = visible_edges;

        let viewport = Viewport::from_rect(rect);
        let mut visible_nodes = 0;
        for node in &frame.nodes {
            if !viewport.contains_circle(node.center, node.radius) {
                continue;
            }
            visible_nodes += 1;

            let base = rgb_color(node.color, node.opacity);
            let fill = if node.selected {
                blend_color(base, SELECTED_COLOR, 0.6)
            } else if node.hovered {
                blend_color(base, HOVER_COLOR, 0.5)
            } else {
                base
            };
            painter.circle_filled(node.center, node.radius, fill);

            let stroke_width = if node.emphasized { 2.2 } else { 1.0 };
            painter.circle_stroke(
                node.center,
                node.radius,
                Stroke::new(
                    stroke_width,
                    with_opacity(Color32::from_rgba_unmultiplied(15, 15, 15, 190), node.opacity),
                ),
            );
            if node.selected {
                painter.circle_stroke(
                    node.center,
                    node.radius + 4.0,
                    Stroke::new(1.6, with_opacity(SELECTED_COLOR, 0.7)),
                );
            }
            if node.pinned {
                painter.circle_filled(node.center, 2.5, Color32::from_gray(240));
            }

            if let Some(label) = &node.label {
                painter.text(
                    node.center + vec2(node.radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    label.as_str(),
                    FontId::proportional(12.0),
                    with_opacity(Color32::from_gray(238), node.opacity.max(0.35)),
                );
            }
        }
        self.visible_node_count = visible_nodes;

        if let Some(hover) = &frame.hover {
            let mut lines = vec![format!("{}  |  {}", hover.label, hover.kind)];
            lines.extend(hover.fields.iter().map(|(key, value)| format!("{key}: {value}")));
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                lines.join("\n"),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }
    }
}
