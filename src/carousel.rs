//! Homepage banner carousel.
//!
//! Two halves that must agree:
//!
//! - [`Carousel`] and [`Autoplay`]: the navigation state machine. Pure, so
//!   every transition is unit tested here. The timer that runs in the page
//!   is `static/carousel.js`, which implements the same transitions; on the
//!   Rust side `Autoplay` only supplies the timer settings the markup hands
//!   to the script.
//! - [`render_carousel`]: the server-rendered markup the script attaches to.
//!
//! ## State machine
//!
//! ```text
//!          next                      prev
//!   0 ──▶ 1 ──▶ … ──▶ N-1 ──▶ 0     0 ──▶ N-1 ──▶ … ──▶ 0
//!
//!   jump_to(i)     i < N → i, otherwise unchanged
//!
//!   Autoplay:  Running ──delay──▶ next, timer resets
//!              Running ──interaction──▶ Paused (stop_on_interaction: Stopped)
//!              Paused ──interaction ends──▶ Running, timer from zero
//! ```
//!
//! ## Markup
//!
//! | Banners | Output |
//! |---------|--------|
//! | 0 | nothing |
//! | 1 | the slide, no buttons, no dots |
//! | N > 1 | slides, prev/next buttons, one dot per slide |

use crate::config::CarouselConfig;
use crate::image::{ImageUrlBuilder, Variant};
use crate::link::link_props;
use crate::query::BannerPopulated;
use maud::{Markup, html};
use std::time::Duration;

/// Slide index over a fixed number of slides, cyclic in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Selected slide. Always 0 for an empty carousel.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether navigation controls are shown at all.
    pub fn has_controls(&self) -> bool {
        self.len > 1
    }

    pub fn next(&mut self) {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    pub fn prev(&mut self) {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }

    /// Select slide `index`; out-of-range values are ignored.
    pub fn jump_to(&mut self, index: usize) {
        if index < self.len {
            self.index = index;
        }
    }
}

/// Autoplay timer driving a [`Carousel`].
#[derive(Debug, Clone)]
pub struct Autoplay {
    delay: Duration,
    elapsed: Duration,
    stop_on_interaction: bool,
    interacting: bool,
    stopped: bool,
}

impl Autoplay {
    pub fn new(delay: Duration, stop_on_interaction: bool) -> Self {
        Self {
            delay,
            elapsed: Duration::ZERO,
            stop_on_interaction,
            interacting: false,
            stopped: false,
        }
    }

    pub fn from_config(config: &CarouselConfig) -> Self {
        Self::new(config.autoplay_delay(), config.stop_on_interaction)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn stops_on_interaction(&self) -> bool {
        self.stop_on_interaction
    }

    /// Whether the timer is currently counting.
    pub fn is_running(&self) -> bool {
        !self.stopped && !self.interacting
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Advance the timer by `dt`. Returns true when the carousel should move
    /// to the next slide; the timer then restarts. A single tick advances at
    /// most one slide.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed >= self.delay {
            self.elapsed = Duration::ZERO;
            true
        } else {
            false
        }
    }

    /// Pointer down, swipe, focus, or a button press.
    pub fn interaction_started(&mut self) {
        if self.stop_on_interaction {
            self.stopped = true;
        }
        self.interacting = true;
    }

    pub fn interaction_ended(&mut self) {
        self.interacting = false;
        self.elapsed = Duration::ZERO;
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Image sizes for slides.
#[derive(Debug, Clone, Copy)]
pub struct SlideImage<'a> {
    pub width: u32,
    pub height: u32,
    pub variants: &'a [Variant],
}

/// Render the carousel for `banners`, already in display order.
pub fn render_carousel(
    banners: &[BannerPopulated],
    images: &ImageUrlBuilder,
    slide: SlideImage<'_>,
    config: &CarouselConfig,
) -> Markup {
    let state = Carousel::new(banners.len());
    if state.is_empty() {
        return html! {};
    }
    let autoplay = Autoplay::from_config(config);

    html! {
        section.carousel aria-roledescription="carousel" aria-label="Destacados"
            data-autoplay-delay=(autoplay.delay().as_millis())
            data-stop-on-interaction=(if autoplay.stops_on_interaction() { "true" } else { "false" })
            data-slides=(state.len()) {
            div.carousel-viewport {
                div.carousel-track {
                    @for (i, banner) in banners.iter().enumerate() {
                        (render_slide(banner, i, &state, images, slide))
                    }
                }
            }
            @if state.has_controls() {
                button.carousel-prev type="button" aria-label="Banner anterior" { "‹" }
                button.carousel-next type="button" aria-label="Siguiente banner" { "›" }
                div.carousel-dots role="group" aria-label="Elegir banner" {
                    @for i in 0..state.len() {
                        @if i == state.index() {
                            button.carousel-dot.is-selected type="button" data-index=(i)
                                aria-label=(format!("Ir al banner {}", i + 1))
                                aria-current="true" {}
                        } @else {
                            button.carousel-dot type="button" data-index=(i)
                                aria-label=(format!("Ir al banner {}", i + 1)) {}
                        }
                    }
                }
            }
        }
    }
}

fn render_slide(
    banner: &BannerPopulated,
    index: usize,
    state: &Carousel,
    images: &ImageUrlBuilder,
    slide: SlideImage<'_>,
) -> Markup {
    let picture = render_slide_image(banner, index, images, slide);
    let label = format!("{} de {}", index + 1, state.len());
    let props = link_props(banner.link.as_ref());

    html! {
        div.carousel-slide role="group" aria-roledescription="slide" aria-label=(label)
            aria-hidden=[(index != state.index()).then_some("true")] {
            @if let Some(props) = props {
                a.carousel-link href=(props.href) target=[props.target] rel=[props.rel]
                    aria-label=(format!("Ver {}", banner.titulo)) {
                    (picture)
                }
            } @else {
                (picture)
            }
        }
    }
}

fn render_slide_image(
    banner: &BannerPopulated,
    index: usize,
    images: &ImageUrlBuilder,
    slide: SlideImage<'_>,
) -> Markup {
    let src = images
        .image(&banner.imagen)
        .width(slide.width)
        .height(slide.height)
        .url();
    let src = match src {
        Ok(src) => src,
        Err(e) => {
            tracing::warn!(banner = %banner.id, error = %e, "banner image omitted");
            return html! { div.carousel-placeholder { span { (banner.titulo) } } };
        }
    };
    let srcset = images.srcset(&banner.imagen, slide.variants).ok();
    let alt = banner.imagen.alt_or(&banner.titulo);
    // First slide is the LCP element; the rest can wait.
    let loading = if index == 0 { "eager" } else { "lazy" };

    html! {
        img src=(src) srcset=[srcset] sizes="100vw" alt=(alt)
            width=(slide.width) height=(slide.height) loading=(loading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImagesConfig;
    use crate::image::ImageField;
    use crate::link::Link;
    use crate::test_helpers::*;

    // =========================================================================
    // State machine
    // =========================================================================

    #[test]
    fn next_wraps_around() {
        let mut c = Carousel::new(5);
        for _ in 0..5 {
            c.next();
        }
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn prev_from_first_goes_to_last() {
        let mut c = Carousel::new(3);
        c.prev();
        assert_eq!(c.index(), 2);
        c.prev();
        assert_eq!(c.index(), 1);
    }

    #[test]
    fn jump_to_ignores_out_of_range() {
        let mut c = Carousel::new(3);
        c.jump_to(2);
        assert_eq!(c.index(), 2);
        c.jump_to(3);
        assert_eq!(c.index(), 2);
    }

    #[test]
    fn empty_and_single_carousels_never_move() {
        let mut empty = Carousel::new(0);
        empty.next();
        empty.prev();
        empty.jump_to(0);
        assert_eq!(empty.index(), 0);
        assert!(!empty.has_controls());

        let mut single = Carousel::new(1);
        single.next();
        assert_eq!(single.index(), 0);
        assert!(!single.has_controls());
    }

    #[test]
    fn autoplay_advances_after_delay() {
        let mut timer = Autoplay::new(Duration::from_secs(5), false);
        assert!(!timer.tick(Duration::from_secs(4)));
        assert!(timer.tick(Duration::from_secs(1)));
        assert!(!timer.tick(Duration::from_secs(1)));
    }

    #[test]
    fn long_tick_fires_once() {
        let mut timer = Autoplay::new(Duration::from_secs(5), false);
        assert!(timer.tick(Duration::from_secs(60)));
        assert!(!timer.tick(Duration::from_secs(1)));
    }

    #[test]
    fn manual_navigation_restarts_countdown() {
        let mut timer = Autoplay::new(Duration::from_secs(5), false);
        timer.tick(Duration::from_secs(4));
        // A button press is a short interaction.
        timer.interaction_started();
        timer.interaction_ended();
        assert!(timer.is_running());
        assert!(!timer.tick(Duration::from_secs(4)));
        assert!(timer.tick(Duration::from_secs(1)));
    }

    #[test]
    fn interaction_pauses_then_resumes_from_zero() {
        let mut timer = Autoplay::new(Duration::from_secs(5), false);
        timer.tick(Duration::from_secs(4));
        timer.interaction_started();
        assert!(!timer.tick(Duration::from_secs(10)));
        timer.interaction_ended();
        assert!(timer.is_running());
        assert!(!timer.tick(Duration::from_secs(4)));
        assert!(timer.tick(Duration::from_secs(1)));
    }

    #[test]
    fn stop_on_interaction_is_permanent() {
        let mut timer = Autoplay::new(Duration::from_secs(5), true);
        timer.interaction_started();
        timer.interaction_ended();
        assert!(timer.is_stopped());
        assert!(!timer.tick(Duration::from_secs(30)));
    }

    #[test]
    fn autoplay_settings_come_from_config() {
        let config = CarouselConfig {
            autoplay_delay_ms: 8000,
            stop_on_interaction: true,
        };
        let timer = Autoplay::from_config(&config);
        assert_eq!(timer.delay(), Duration::from_secs(8));
        assert!(timer.stops_on_interaction());
    }

    // =========================================================================
    // Markup
    // =========================================================================

    fn banner(id: &str, titulo: &str, link: Option<Link>) -> BannerPopulated {
        BannerPopulated {
            id: id.to_string(),
            titulo: titulo.to_string(),
            imagen: test_image(Some("Estudiantes en el patio")),
            posicion: Some(1),
            activo: None,
            link,
        }
    }

    fn render(banners: &[BannerPopulated]) -> String {
        let images = ImageUrlBuilder::new("proj", "production");
        let sizes = ImagesConfig::default();
        let slide = SlideImage {
            width: sizes.banner_width,
            height: sizes.banner_height,
            variants: &sizes.banner_variants,
        };
        render_carousel(banners, &images, slide, &CarouselConfig::default()).into_string()
    }

    #[test]
    fn no_banners_render_nothing() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn single_banner_has_no_controls() {
        let html = render(&[banner("b1", "Admisiones", None)]);
        assert!(html.contains("carousel-slide"));
        assert!(!html.contains("carousel-prev"));
        assert!(!html.contains("carousel-next"));
        assert!(!html.contains("carousel-dot"));
    }

    #[test]
    fn several_banners_have_buttons_and_dots() {
        let html = render(&[
            banner("b1", "Uno", None),
            banner("b2", "Dos", None),
            banner("b3", "Tres", None),
        ]);
        assert!(html.contains("carousel-prev"));
        assert!(html.contains("carousel-next"));
        assert_eq!(html.matches("data-index=").count(), 3);
        assert_eq!(html.matches("aria-current=\"true\"").count(), 1);
        assert_eq!(html.matches("aria-hidden=\"true\"").count(), 2);
        assert!(html.contains("data-autoplay-delay=\"5000\""));
        assert!(html.contains("data-stop-on-interaction=\"false\""));
    }

    #[test]
    fn slide_image_sizes() {
        let html = render(&[banner("b1", "Admisiones", None)]);
        assert!(html.contains("w=1920&amp;h=600"));
        assert!(html.contains("w=640&amp;h=200&amp;fm=webp 640w"));
        assert!(html.contains("w=1024&amp;h=320&amp;fm=webp 1024w"));
        assert!(html.contains("sizes=\"100vw\""));
        assert!(html.contains("alt=\"Estudiantes en el patio\""));
    }

    #[test]
    fn alt_falls_back_to_title() {
        let mut b = banner("b1", "Admisiones 2026", None);
        b.imagen.alt = None;
        assert!(render(&[b]).contains("alt=\"Admisiones 2026\""));
    }

    #[test]
    fn external_slide_opens_new_tab() {
        let link = Link::External {
            url: "https://example.org/inscripcion".to_string(),
        };
        let html = render(&[banner("b1", "Inscripción", Some(link))]);
        assert!(html.contains("href=\"https://example.org/inscripcion\""));
        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("rel=\"noopener noreferrer\""));
        assert!(html.contains("aria-label=\"Ver Inscripción\""));
    }

    #[test]
    fn unlinked_slide_has_no_anchor() {
        let html = render(&[banner("b1", "Admisiones", Some(Link::None))]);
        assert!(!html.contains("<a "));
    }

    #[test]
    fn missing_asset_renders_placeholder() {
        let mut b = banner("b1", "Sin imagen", None);
        b.imagen = ImageField::default();
        let html = render(&[b]);
        assert!(html.contains("carousel-placeholder"));
        assert!(!html.contains("<img"));
    }
}
