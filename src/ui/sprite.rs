use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eframe::egui;
use tracing::warn;

use crate::model::affect::Scene;
use crate::model::appearance::{Expression, OutfitStage};

const OUTFITS: &str = "sprite/outfits";
const OVERLAYS: &str = "sprite/overlays";
const SCENES: &str = "scenes";

/// Image files for one frame of the avatar, back to front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteLayers {
    pub background: PathBuf,
    pub base: PathBuf,
    pub eyes: PathBuf,
    pub mouth: PathBuf,
    pub blush: Option<PathBuf>,
}

impl SpriteLayers {
    pub fn resolve(
        root: &Path,
        scene: Option<Scene>,
        outfit: OutfitStage,
        expression: Expression,
        blush: bool,
    ) -> Self {
        let (eyes, mouth) = expression_overlays(expression);
        let overlay = |name: &str| root.join(OVERLAYS).join(name);

        Self {
            background: root.join(SCENES).join(scene_file(scene)),
            base: root.join(OUTFITS).join(outfit_file(outfit)),
            eyes: overlay(eyes),
            mouth: overlay(mouth),
            blush: blush.then(|| overlay("blush.png")),
        }
    }

    /// Character layers stacked over the background, back to front.
    fn figure(&self) -> impl Iterator<Item = &PathBuf> {
        [&self.base, &self.eyes, &self.mouth]
            .into_iter()
            .chain(self.blush.as_ref())
    }
}

fn outfit_file(outfit: OutfitStage) -> &'static str {
    match outfit {
        OutfitStage::Casual => "casual/base.png",
        OutfitStage::CasualPullshirt => "casual/pullshirt.png",
        OutfitStage::CasualBoth => "casual/both.png",
        OutfitStage::Comfy => "comfy.png",
        OutfitStage::Date => "date/base.png",
        OutfitStage::OvercoatButtoned => "overcoat/buttoned.png",
        OutfitStage::OvercoatOpenTopless => "overcoat/open_topless.png",
        // No dedicated art; the fully revealed casual frame stands in.
        OutfitStage::OvercoatNude => "casual/both.png",
    }
}

/// (eyes, mouth)
fn expression_overlays(expression: Expression) -> (&'static str, &'static str) {
    match expression {
        Expression::Neutral => ("eyes_open.png", "mouth_closed.png"),
        Expression::Happy => ("eyes_open.png", "mouth_smile.png"),
        Expression::Smirk => ("eyes_open.png", "mouth_smirk.png"),
        Expression::Wink => ("eyes_wink.png", "mouth_smile.png"),
        Expression::Closed => ("eyes_closed.png", "mouth_smile.png"),
        Expression::Pout => ("eyes_open.png", "mouth_pout.png"),
    }
}

fn scene_file(scene: Option<Scene>) -> &'static str {
    match scene {
        Some(Scene::Room) => "room.jpg",
        Some(Scene::Beach) => "beach.jpg",
        Some(Scene::Park) | None => "park.jpg",
    }
}

/// Decoded textures keyed by path. A file that fails to load is remembered
/// as `None` so it is reported once, not every frame.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<PathBuf, Option<egui::TextureHandle>>,
}

impl TextureCache {
    pub fn get(&mut self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
        if let Some(cached) = self.textures.get(path) {
            return cached.clone();
        }

        let loaded = match load_image(path) {
            Ok(image) => Some(ctx.load_texture(
                path.display().to_string(),
                image,
                egui::TextureOptions::LINEAR,
            )),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "sprite layer unavailable");
                None
            }
        };

        self.textures.insert(path.to_path_buf(), loaded.clone());
        loaded
    }
}

fn load_image(path: &Path) -> Result<egui::ColorImage, image::ImageError> {
    let rgba = image::open(path)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

const FULL_UV: egui::Rect = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

/// Paint the avatar into a `max_size` panel. The background covers the whole
/// panel and is cropped to keep its own aspect ratio; the character layers
/// share one rect fitted to the base outfit.
pub fn draw_sprite(
    ui: &mut egui::Ui,
    cache: &mut TextureCache,
    layers: &SpriteLayers,
    max_size: egui::Vec2,
) {
    let ctx = ui.ctx().clone();
    let (panel, _) = ui.allocate_exact_size(max_size, egui::Sense::hover());
    let painter = ui.painter_at(panel);

    let mut painted = false;

    if let Some(background) = cache.get(&ctx, &layers.background) {
        let uv = cover_uv(texture_size(&background), panel.size());
        painter.image(background.id(), panel, uv, egui::Color32::WHITE);
        painted = true;
    }

    let figure_rect = match cache.get(&ctx, &layers.base) {
        Some(base) => fit_within(texture_size(&base), panel),
        None => panel,
    };
    for path in layers.figure() {
        if let Some(texture) = cache.get(&ctx, path) {
            painter.image(texture.id(), figure_rect, FULL_UV, egui::Color32::WHITE);
            painted = true;
        }
    }

    if !painted {
        painter.rect_filled(panel, 8.0, egui::Color32::from_gray(40));
        painter.text(
            panel.center(),
            egui::Align2::CENTER_CENTER,
            "no sprite assets",
            egui::FontId::proportional(14.0),
            egui::Color32::GRAY,
        );
    }
}

fn texture_size(texture: &egui::TextureHandle) -> egui::Vec2 {
    let [w, h] = texture.size();
    egui::vec2(w as f32, h as f32)
}

/// Largest rect with the image's aspect ratio that fits inside `bounds`,
/// centered.
fn fit_within(image: egui::Vec2, bounds: egui::Rect) -> egui::Rect {
    if image.x <= 0.0 || image.y <= 0.0 {
        return bounds;
    }
    let scale = (bounds.width() / image.x).min(bounds.height() / image.y);
    egui::Rect::from_center_size(bounds.center(), image * scale)
}

/// Texture coordinates that crop `image` to fill `target` without
/// stretching, keeping the center.
fn cover_uv(image: egui::Vec2, target: egui::Vec2) -> egui::Rect {
    if image.x <= 0.0 || image.y <= 0.0 || target.x <= 0.0 || target.y <= 0.0 {
        return FULL_UV;
    }
    let image_aspect = image.x / image.y;
    let target_aspect = target.x / target.y;

    let (w, h) = if image_aspect > target_aspect {
        (target_aspect / image_aspect, 1.0)
    } else {
        (1.0, image_aspect / target_aspect)
    };
    egui::Rect::from_center_size(egui::pos2(0.5, 0.5), egui::vec2(w, h))
}
