//! # Quire CLI
//!
//! Usage:
//!   quire template.json --data data.json -o output.pdf
//!   quire --example > template.json
//!   quire --example-data > data.json

use std::path::PathBuf;

use clap::Parser;
use quire::data::{DataSource, EmptyDataSource, JsonDataSource};
use quire::error::QuireError;
use quire::model::Template;
use quire::{RenderOptions, Renderer};

#[derive(Parser, Debug)]
#[command(version, about = "Bind a template to data and render it to PDF", long_about = None)]
struct Args {
    /// Template document (JSON)
    template: Option<PathBuf>,

    /// Data document (JSON). Without it every binding is empty.
    #[arg(long)]
    data: Option<PathBuf>,

    #[arg(short, long, default_value = "output.pdf")]
    output: PathBuf,

    /// Render options (JSON)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Document title, overrides the options file
    #[arg(long)]
    title: Option<String>,

    /// Document author, overrides the options file
    #[arg(long)]
    author: Option<String>,

    /// Print a sample template and exit
    #[arg(long, default_value_t = false)]
    example: bool,

    /// Print data matching the sample template and exit
    #[arg(long, default_value_t = false)]
    example_data: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("quire=info")).init();
    let args = Args::parse();

    if args.example {
        print!("{}", EXAMPLE_TEMPLATE);
        return;
    }
    if args.example_data {
        print!("{}", EXAMPLE_DATA);
        return;
    }

    match run(&args) {
        Ok(pages) => eprintln!("✓ Written {} page(s) to {}", pages, args.output.display()),
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<usize, QuireError> {
    let Some(template_path) = &args.template else {
        return Err(QuireError::Template(
            "no template given (try --example)".to_string(),
        ));
    };
    let mut template = Template::new();
    template.load_from(template_path)?;

    let data: Box<dyn DataSource> = match &args.data {
        Some(path) => Box::new(JsonDataSource::from_path(path)?),
        None => Box::new(EmptyDataSource),
    };

    let mut options = match &args.options {
        Some(path) => RenderOptions::from_path(path)?,
        None => RenderOptions::default(),
    };
    if let Some(title) = &args.title {
        options.title = Some(title.clone());
    }
    if let Some(author) = &args.author {
        options.author = Some(author.clone());
    }

    Renderer::new(options).render_to_pdf_file(&template, data.as_ref(), &args.output)
}

const EXAMPLE_TEMPLATE: &str = r##"[
  {
    "type": "Page",
    "name": "invoice",
    "direction": "TopToBottom",
    "initialWidth": 595,
    "initialHeight": 842,
    "subitems": [
      {
        "type": "Text",
        "name": "title",
        "posX": 40,
        "posY": 40,
        "initialWidth": 515,
        "initialHeight": 30,
        "maxWidth": 515,
        "maxHeight": 30,
        "fontSize": 20,
        "fontWeight": 700,
        "dataKey": "title",
        "data": "Invoice"
      },
      {
        "type": "Condition",
        "name": "payment",
        "data": "paid",
        "subitems": [
          {
            "type": "Text",
            "posX": 40,
            "posY": 80,
            "initialWidth": 200,
            "initialHeight": 20,
            "fontWeight": 700,
            "data": "PAID"
          },
          {
            "type": "Text",
            "posX": 40,
            "posY": 80,
            "initialWidth": 200,
            "initialHeight": 20,
            "data": "Payment due within 30 days"
          }
        ]
      },
      {
        "type": "Loop",
        "name": "lines",
        "dataKey": "lines",
        "overflowBehavior": "OverflowOnNewPage",
        "posX": 40,
        "posY": 120,
        "initialWidth": 515,
        "initialHeight": 660,
        "maxWidth": 515,
        "maxHeight": 660,
        "subitems": [
          {
            "type": "Frame",
            "name": "line",
            "direction": "LeftToRight",
            "initialWidth": 515,
            "initialHeight": 24,
            "maxWidth": 515,
            "maxHeight": 24,
            "borderWidth": 0.5,
            "borderColor": "#FF999999",
            "subitems": [
              {
                "type": "Text",
                "posX": 6,
                "posY": 5,
                "initialWidth": 380,
                "initialHeight": 14,
                "fontSize": 10,
                "dataKey": "description"
              },
              {
                "type": "Text",
                "posX": 409,
                "posY": 5,
                "initialWidth": 100,
                "initialHeight": 14,
                "fontSize": 10,
                "textAlign": "Right",
                "dataKey": "amount"
              }
            ]
          }
        ]
      },
      {
        "type": "Text",
        "name": "footer",
        "overflowBehavior": "CopyOnNewPages",
        "posX": 40,
        "posY": 800,
        "initialWidth": 515,
        "initialHeight": 14,
        "fontSize": 8,
        "textAlign": "Center",
        "data": "Rendered with quire"
      }
    ]
  }
]
"##;

const EXAMPLE_DATA: &str = r##"{
  "title": "Invoice #2026-001",
  "paid": false,
  "lines": [
    { "description": "Discovery workshop", "amount": "1 200.00" },
    { "description": "Template design", "amount": "2 450.00" },
    { "description": "Data integration", "amount": "980.00" },
    { "description": "Layout review", "amount": "320.00" },
    { "description": "Support, first month", "amount": "150.00" }
  ]
}
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use quire::canvas::RecordingCanvas;

    /// Every key written in `sample` survives a decode and encode.
    fn assert_keys_kept(sample: &serde_json::Value, saved: &serde_json::Value) {
        let (Some(sample), Some(saved)) = (sample.as_object(), saved.as_object()) else {
            panic!("expected records, got {sample} and {saved}");
        };
        for key in sample.keys() {
            assert!(saved.contains_key(key), "'{key}' is dropped from {sample:?}");
        }
        let empty = Vec::new();
        let sample_children = sample.get("subitems").and_then(|c| c.as_array()).unwrap_or(&empty);
        let saved_children = saved.get("subitems").and_then(|c| c.as_array()).unwrap_or(&empty);
        assert_eq!(sample_children.len(), saved_children.len());
        for (a, b) in sample_children.iter().zip(saved_children) {
            assert_keys_kept(a, b);
        }
    }

    #[test]
    fn example_template_uses_only_stored_fields() {
        let sample: serde_json::Value = serde_json::from_str(EXAMPLE_TEMPLATE).unwrap();
        let saved = Template::from_json_str(EXAMPLE_TEMPLATE).unwrap().to_json();
        for (a, b) in sample.as_array().unwrap().iter().zip(saved.as_array().unwrap()) {
            assert_keys_kept(a, b);
        }
    }

    #[test]
    fn example_renders_with_its_data() {
        let template = Template::from_json_str(EXAMPLE_TEMPLATE).unwrap();
        let data = JsonDataSource::parse(EXAMPLE_DATA).unwrap();
        let mut canvas = RecordingCanvas::new();
        let pages = Renderer::default().render(&template, &data, &mut canvas).unwrap();
        assert_eq!(pages, 1);
        let texts = canvas.page_texts();
        assert!(texts[0].iter().any(|t| t == "Invoice #2026-001"));
        assert!(texts[0].iter().any(|t| t == "Payment due within 30 days"));
    }
}
