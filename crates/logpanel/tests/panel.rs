//! End-to-end behaviour of a panel wired to real capture contexts.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use logpanel::capture::{LineFigure, StreamId};
use logpanel::prelude::*;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn panel_with(config: PanelConfig) -> (LogPanel, Arc<Console>, LogRouter, Arc<Plotter>) {
    let console = Console::with_target(io::sink());
    let router = LogRouter::new();
    let plotter = Plotter::new();
    let contexts =
        CaptureContexts::new(console.clone(), router.clone()).with_plotter(plotter.clone());
    let panel = LogPanel::new(&config, contexts).unwrap();
    (panel, console, router, plotter)
}

#[test]
fn history_keeps_the_most_recent_entries() {
    let (mut panel, ..) = panel_with(PanelConfig::default().with_max_history(3));
    for i in 1..=10 {
        panel.logger().print(i);
    }
    assert_eq!(panel.value(), "8\n9\n10\n");
    assert_eq!(panel.view().sink().len(), 3);
}

#[test]
fn clear_then_value_is_empty() {
    let (mut panel, ..) = panel_with(PanelConfig::default());
    panel.logger().print("x");
    panel.process_pending();
    panel.clear();
    assert_eq!(panel.value(), "");
}

#[test]
fn printing_redirects_console_output() {
    let (mut panel, console, ..) = panel_with(PanelConfig::default());
    panel.set_printing(true);
    console.println("0").unwrap();
    assert_eq!(panel.value(), "0\n");
}

#[test]
fn html_mode_renders_printed_markup() {
    let (mut panel, console, ..) = panel_with(PanelConfig::default().with_printing(true));
    console.println("<b>0</b>").unwrap();
    assert_eq!(panel.value(), "<b>0</b>\n");

    panel.clear();
    panel.set_html(true);
    console.println("<b>0</b>").unwrap();
    assert_eq!(panel.value(), "0\n\n");
}

#[test]
fn logging_is_captured_only_while_attached() {
    let (mut panel, _, router, _) =
        panel_with(PanelConfig::default().with_log_format("{level}|| {message}"));
    let subscriber = tracing_subscriber::registry().with(router.layer());

    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!("before");
        panel.set_logging(true);
        tracing::warn!("0");
        panel.set_logging(false);
        tracing::warn!("after");
    });

    assert_eq!(panel.value(), "WARNING|| 0\n");
    assert_eq!(router.handler_count(), 0);
}

#[test]
fn named_logger_only_sees_its_targets() {
    let (mut panel, _, router, _) = panel_with(
        PanelConfig::default()
            .with_logger_name("app")
            .with_logging(true),
    );
    let subscriber = tracing_subscriber::registry().with(router.layer());

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "app::jobs", "kept");
        tracing::info!(target: "other", "dropped");
    });

    assert_eq!(panel.value(), "kept\n");
}

#[test]
fn toggles_restore_prior_state() {
    let original = Captured::default();
    let console = Console::with_target(original.clone());
    let router = LogRouter::new();
    let plotter = Plotter::new();
    let contexts =
        CaptureContexts::new(console.clone(), router.clone()).with_plotter(plotter.clone());
    let mut panel = LogPanel::new(&PanelConfig::default(), contexts).unwrap();

    panel.set_printing(true);
    panel.set_logging(true);
    panel.set_plotting(true).unwrap();
    assert_ne!(console.current(), StreamId::ORIGINAL);
    assert_eq!(router.handler_count(), 1);
    assert!(plotter.has_target());
    assert_eq!(plotter.backend_name(), "inline");

    panel.set_printing(false);
    panel.set_logging(false);
    panel.set_plotting(false).unwrap();
    assert_eq!(console.current(), StreamId::ORIGINAL);
    assert_eq!(router.handler_count(), 0);
    assert!(!plotter.has_target());
    assert_eq!(plotter.backend_name(), "headless");

    console.println("back").unwrap();
    assert_eq!(original.text(), "back\n");
    assert_eq!(panel.value(), "");
}

#[test]
fn printing_released_out_of_order_across_panels() {
    let original = Captured::default();
    let console = Console::with_target(original.clone());
    let router = LogRouter::new();
    let mut a = LogPanel::new(
        &PanelConfig::default(),
        CaptureContexts::new(console.clone(), router.clone()),
    )
    .unwrap();
    let mut b = LogPanel::new(
        &PanelConfig::default(),
        CaptureContexts::new(console.clone(), router.clone()),
    )
    .unwrap();

    a.set_printing(true);
    b.set_printing(true);
    a.set_printing(false);
    console.println("to b").unwrap();
    b.set_printing(false);

    assert_eq!(console.current(), StreamId::ORIGINAL);
    console.println("after").unwrap();
    assert_eq!(a.value(), "");
    assert_eq!(b.value(), "to b\n");
    assert_eq!(original.text(), "after\n");
}

#[test]
fn dropping_the_panel_releases_every_capture() {
    let console = Console::with_target(io::sink());
    let router = LogRouter::new();
    let plotter = Plotter::new();
    let contexts =
        CaptureContexts::new(console.clone(), router.clone()).with_plotter(plotter.clone());
    let config = PanelConfig::default()
        .with_printing(true)
        .with_logging(true)
        .with_plotting(true);
    let panel = LogPanel::new(&config, contexts).unwrap();
    let logger = panel.logger().clone();
    drop(panel);

    assert_eq!(console.current(), StreamId::ORIGINAL);
    assert_eq!(router.handler_count(), 0);
    assert!(!plotter.has_target());
    assert!(!logger.is_connected());
    logger.print("ignored");
}

#[test]
fn plots_shown_during_capture_become_images() {
    let (mut panel, _, _, plotter) =
        panel_with(PanelConfig::default().with_background([30, 30, 30]));
    panel.set_plotting(true).unwrap();
    assert!(plotter.style().dark);
    assert_eq!(plotter.style().facecolor_hex(), "#1e1e1e");

    plotter.add_figure(LineFigure::new(90, 20).with_series([(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]));
    plotter.show().unwrap();
    panel.set_plotting(false).unwrap();

    assert_eq!(panel.value(), "\u{fffc}\n\n");
    let image = panel.view().image(0).unwrap();
    assert_eq!((image.width(), image.height()), (360, 80));
}

#[test]
fn second_panel_cannot_claim_the_plot_target() {
    let plotter = Plotter::new();
    let make = || {
        CaptureContexts::new(Console::with_target(io::sink()), LogRouter::new())
            .with_plotter(plotter.clone())
    };
    let mut first = LogPanel::new(&PanelConfig::default(), make()).unwrap();
    let mut second = LogPanel::new(&PanelConfig::default(), make()).unwrap();

    first.set_plotting(true).unwrap();
    assert!(matches!(
        second.set_plotting(true),
        Err(PanelError::Plot(PlotError::TargetBusy))
    ));
    assert!(!second.state().plotting);

    first.set_plotting(false).unwrap();
    second.set_plotting(true).unwrap();
}

#[test]
fn mixed_content_snapshot() {
    let (mut panel, ..) = panel_with(PanelConfig::default());
    let logger = panel.logger().clone();
    logger.print("plain");
    logger.print_rst("Some *emphasis*.");
    let mut table = Table::new(["a", "b"]);
    table.push_row([Cell::from(1_i64), Cell::from("x")]);
    logger.print_table(&table, &TableOptions::default());

    assert_eq!(
        panel.value(),
        "plain\nSome emphasis.\n\n\ta\tb\n0\t1\tx\n\n"
    );
}

#[test]
fn saved_image_round_trips_through_the_panel() {
    let dir = tempfile::tempdir().unwrap();
    let (mut panel, ..) = panel_with(PanelConfig::default());
    let field = logpanel::render::ScalarField::from_rows(&[vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
    panel
        .logger()
        .print_image(field, &ImageOptions::default().with_width(4))
        .unwrap();
    panel.process_pending();

    let mut prompt = Some::<PathBuf>(dir.path().join("field"));
    let saved = panel.save_image_as(0, &mut prompt).unwrap().unwrap();
    assert_eq!(saved.extension().and_then(|e| e.to_str()), Some("png"));
    assert_eq!(image::open(&saved).unwrap().width(), 4);
    assert_eq!(panel.exporter().last_dir(), Some(dir.path()));
}
