//! Counter Example - reactive state, event handlers and keyed lists
//!
//! Renders a counter with a history list into the in-memory host, drives it
//! with synthetic clicks and prints the document after every step.
//!
//! Run with: RUST_LOG=spark_dom=debug cargo run --example counter

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use spark_dom::{Host, MemoryHost, Runtime, TemplateAsset, el, render, template};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), spark_dom::SparkError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== spark-dom Counter Example ===\n");

    let rt = Runtime::default();
    rt.register_template(
        "badge",
        TemplateAsset::new(r#"<span class="badge">{{LABEL}}: {{SLOT}}</span>"#).with_css(".badge { font-weight: bold }"),
    );

    let state = rt.create_reactive(json!({ "count": 0, "history": [] }))?;
    let host = Rc::new(RefCell::new(MemoryHost::new()));
    let root = host.borrow_mut().create_root();

    let s = state.clone();
    let handle = render(
        &rt,
        move || {
            let writer = s.clone();
            let history = s.get("history");
            let entries = history.as_reactive().map(|r| r.iter()).unwrap_or_default();
            el("main")
                .attr("class", "app")
                .attr("md:class", "app wide")
                .child(template("badge").attr("label", "Count").child(s.get("count")))
                .child(el("button").attr("id", "inc").child("+1").on("click", move |_| {
                    let next = writer.peek("count").as_i64().unwrap_or(0) + 1;
                    writer.set("count", next);
                    if let Some(history) = writer.peek("history").as_reactive() {
                        history.insert(0, next);
                    }
                }))
                .child(el("ul").children(entries.into_iter().map(|n| el("li").key(n.clone()).child(n))))
        },
        host.clone(),
        root,
    )?;

    println!("Initial:\n  {}\n", host.borrow().inner_html(root));

    let button = host.borrow().find_by_id(root, "inc");
    if let Some(button) = button {
        for step in 1..=3 {
            MemoryHost::click(&host, button);
            println!("After click {step}:\n  {}\n", host.borrow().inner_html(root));
        }
    }

    rt.set_viewport_width(480.0);
    println!("Narrow viewport ({}):\n  {}\n", rt.viewport_tier_name(), host.borrow().inner_html(root));

    println!("Render passes: {}", handle.render_count());
    println!("Stylesheets injected: {}", host.borrow().stylesheets().len());

    handle.unmount();
    println!("After unmount: {:?}", host.borrow().inner_html(root));
    Ok(())
}
