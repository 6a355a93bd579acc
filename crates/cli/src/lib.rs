use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::{page_status, parse_zoom_text, zoom_label, OutlineNode};
use pdf_engine::{OpenSource, PdfEngine, RenderRequest, ThumbnailSize};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use viewer_core::{DocRect, Point, Rect, Size, ViewerConfig};

pub mod app;

pub use app::{ensure_pdf_exists, CutterApp};

#[derive(Debug, Parser)]
#[command(name = "pdf-cutter")]
#[command(about = "Inspect, search and cut PDF page ranges")]
pub struct Cli {
    /// JSON viewer settings (dpi, zoom limits, page gap, ...).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Viewport size in pixels, as WIDTHxHEIGHT.
    #[arg(
        long,
        global = true,
        value_name = "WxH",
        value_parser = parse_size,
        default_value = "800x600"
    )]
    viewport: Size,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the page layout of the scrolling canvas.
    Layout {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Zoom as a percentage or factor text, e.g. `125%`.
        #[arg(long)]
        zoom: Option<String>,
    },
    /// Report which page is current with the viewport scrolled to an offset.
    PageAt {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        scroll: i32,
        #[arg(long)]
        zoom: Option<String>,
    },
    /// Search every page and list match rectangles.
    Search {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "TEXT")]
        text: String,
        #[arg(long)]
        zoom: Option<String>,
    },
    /// Copy the text under a canvas selection.
    Text {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Selection start on the canvas, as X,Y.
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        from: Point,
        /// Selection end on the canvas, as X,Y.
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        to: Point,
        #[arg(long)]
        zoom: Option<String>,
    },
    /// Print the table of contents as a tree.
    Toc {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Write a 1-based inclusive page range to a new PDF.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// First page (1-based). Defaults to the current page.
        #[arg(long)]
        from: Option<u32>,
        /// Last page (1-based). Defaults to the last page.
        #[arg(long)]
        to: Option<u32>,
        /// Page treated as current when `--from` is omitted (1-based).
        #[arg(long, default_value_t = 1)]
        current_page: u32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Render a page to PNG, optionally highlighting search matches.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        zoom: Option<String>,
        #[arg(long)]
        highlight: Option<String>,
        /// Render a thumbnail bounded by WIDTHxHEIGHT instead.
        #[arg(long, value_parser = parse_size)]
        thumbnail: Option<Size>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    title: String,
    page_count: u32,
    first_page_size_pt: Option<PageSizeOutput>,
    outline_entries: usize,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct LayoutOutput {
    zoom: String,
    render_scale: f32,
    canvas: Size,
    pages: Vec<PageRegionOutput>,
}

#[derive(Debug, Serialize)]
struct PageRegionOutput {
    index: usize,
    #[serde(flatten)]
    region: Rect,
}

#[derive(Debug, Serialize)]
struct PageAtOutput {
    scroll_offset: i32,
    page: usize,
    label: String,
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    query: String,
    total: usize,
    status: String,
    first_page: Option<usize>,
    hits: Vec<SearchPageOutput>,
}

#[derive(Debug, Serialize)]
struct SearchPageOutput {
    page: usize,
    rects: Vec<DocRect>,
    canvas: Vec<Rect>,
}

#[derive(Debug, Serialize)]
struct ExportOutput {
    from: u32,
    to: u32,
    pages: u32,
    output: String,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Layout { file, zoom } => {
            let app = open_app(&file, config, cli.viewport, zoom.as_deref())?;
            run_layout(&app)
        }
        Commands::PageAt { file, scroll, zoom } => {
            let mut app = open_app(&file, config, cli.viewport, zoom.as_deref())?;
            run_page_at(&mut app, scroll)
        }
        Commands::Search { file, text, zoom } => {
            let mut app = open_app(&file, config, cli.viewport, zoom.as_deref())?;
            run_search(&mut app, &text)
        }
        Commands::Text { file, from, to, zoom } => {
            let mut app = open_app(&file, config, cli.viewport, zoom.as_deref())?;
            run_text(&mut app, from, to)
        }
        Commands::Toc { file } => {
            let app = open_app(&file, config, cli.viewport, None)?;
            let outline: &[OutlineNode] =
                app.session().document.as_ref().map_or(&[][..], |doc| doc.outline.as_slice());
            print_json(outline)
        }
        Commands::Export { file, from, to, current_page, output } => {
            let mut app = open_app(&file, config, cli.viewport, None)?;
            run_export(&mut app, from, to, current_page, output)
        }
        Commands::Render { file, page, zoom, highlight, thumbnail, output } => {
            let mut app = open_app(&file, config, cli.viewport, zoom.as_deref())?;
            run_render(&mut app, &file, page, highlight.as_deref(), thumbnail, output.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Reads viewer settings from a JSON file; missing keys keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: ViewerConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate().with_context(|| format!("invalid config {}", path.display()))?;

    log::debug!("loaded config from {}: {config:?}", path.display());
    Ok(config)
}

fn open_app(
    file: &Path,
    config: ViewerConfig,
    viewport: Size,
    zoom: Option<&str>,
) -> Result<CutterApp> {
    let mut app = CutterApp::new(config);
    app.set_viewport_size(viewport);
    app.open(file)?;

    if let Some(zoom) = zoom {
        let factor = parse_zoom_text(zoom).with_context(|| format!("invalid zoom: {zoom}"))?;
        app.set_zoom(factor)?;
    }

    Ok(app)
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = pdf_engine::default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let first_page_size_pt = if page_count > 0 {
        let size = engine.page_size(handle, 0)?;
        Some(PageSizeOutput { width: size.width_pt, height: size.height_pt })
    } else {
        None
    };

    let payload = InfoOutput {
        path: file.display().to_string(),
        title: file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        page_count,
        first_page_size_pt,
        outline_entries: engine.outline(handle)?.len(),
    };

    print_json(&payload)?;

    engine.close(handle)?;

    Ok(())
}

fn run_layout(app: &CutterApp) -> Result<()> {
    let viewer = app.viewer();
    let layout = viewer.layout();

    let payload = LayoutOutput {
        zoom: zoom_label(viewer.zoom()),
        render_scale: viewer.render_scale(),
        canvas: layout.canvas_size(),
        pages: layout
            .regions()
            .map(|(index, region)| PageRegionOutput { index, region })
            .collect(),
    };

    print_json(&payload)
}

fn run_page_at(app: &mut CutterApp, scroll: i32) -> Result<()> {
    app.scroll_to(scroll);

    let page = app.viewer().active_page();
    let payload = PageAtOutput {
        scroll_offset: app.viewer().scroll_offset(),
        page,
        label: page_status(page as u32, app.session().page_count()),
    };

    print_json(&payload)
}

fn run_search(app: &mut CutterApp, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("search text is empty");
    }

    let total = app.search(text)?;
    let viewer = app.viewer();
    let hits = viewer.search_hits();
    let canvas = hits.canvas_rects(viewer.layout(), viewer.render_scale());

    let payload = SearchOutput {
        query: text.trim().to_owned(),
        total,
        status: app.status().to_owned(),
        first_page: hits.first_page(),
        hits: hits
            .pages()
            .map(|page| SearchPageOutput {
                page,
                rects: hits.for_page(page).to_vec(),
                canvas: canvas
                    .iter()
                    .filter(|(hit_page, _)| *hit_page == page)
                    .map(|(_, rect)| *rect)
                    .collect(),
            })
            .collect(),
    };

    print_json(&payload)
}

fn run_text(app: &mut CutterApp, from: Point, to: Point) -> Result<()> {
    app.press(from);
    app.drag_to(to);

    if let Some(text) = app.release(to)? {
        println!("{text}");
    }

    Ok(())
}

fn run_export(
    app: &mut CutterApp,
    from: Option<u32>,
    to: Option<u32>,
    current_page: u32,
    output: Option<PathBuf>,
) -> Result<()> {
    if current_page == 0 {
        anyhow::bail!("--current-page is 1-based and must be >= 1");
    }
    app.go_to_page(current_page - 1);

    let request = app.export(from, to, output)?;
    eprintln!("{}", app.status());

    print_json(&ExportOutput {
        from: request.from,
        to: request.to,
        pages: request.page_total(),
        output: request.output.display().to_string(),
    })
}

fn run_render(
    app: &mut CutterApp,
    file: &Path,
    page: u32,
    highlight: Option<&str>,
    thumbnail: Option<Size>,
    output: Option<&Path>,
) -> Result<()> {
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    let page_index = page - 1;
    let handle = app.handle().context("no document is open")?;

    if let Some(text) = highlight {
        app.search(text)?;
    }

    let image = match thumbnail {
        Some(size) => app
            .engine()
            .render_thumbnail(
                handle,
                page_index,
                ThumbnailSize {
                    width_px: size.width.max(1) as u32,
                    height_px: size.height.max(1) as u32,
                },
            )
            .context("failed to render thumbnail")?,
        None => {
            let viewer = app.viewer();
            let request = RenderRequest {
                page_index,
                scale: viewer.render_scale(),
                clip: None,
                highlights: viewer.search_hits().for_page(page_index as usize).to_vec(),
            };
            app.engine().render_page(handle, request).context("failed to render page")?
        }
    };

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));

    if let Some(parent) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(payload: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    println!("{json}");
    Ok(())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}

fn parse_pair(value: &str, separator: char) -> Result<(i32, i32), String> {
    let (a, b) = value
        .split_once(separator)
        .ok_or_else(|| format!("expected two numbers separated by '{separator}'"))?;
    let parse = |part: &str| part.trim().parse::<i32>().map_err(|err| err.to_string());
    Ok((parse(a)?, parse(b)?))
}

fn parse_size(value: &str) -> Result<Size, String> {
    let (width, height) = parse_pair(value, 'x')?;
    if width < 0 || height < 0 {
        return Err("size must not be negative".to_owned());
    }
    Ok(Size::new(width, height))
}

fn parse_point(value: &str) -> Result<Point, String> {
    let (x, y) = parse_pair(value, ',')?;
    Ok(Point::new(x, y))
}
