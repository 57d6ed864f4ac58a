//! `neurocite ask`: answer a single question.

use neurocite_core::answer::Answer;
use neurocite_core::event::{AgentEvent, EventBus};
use neurocite_gateway::QueryResponse;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct AskOptions {
    pub json: bool,
    pub progress: bool,
    pub trace: bool,
}

pub async fn run(question: &str, options: AskOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let event_bus = Arc::new(EventBus::default());
    let agent = super::build_agent(&config, event_bus.clone()).await?;

    let progress = options.progress.then(|| {
        let mut rx = event_bus.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if let Some(line) = progress_line(&event) {
                    eprintln!("  {line}");
                }
            }
        })
    });

    if !options.json && !options.progress {
        eprint!("  Researching...");
    }
    let answer = agent.answer(question).await;
    if !options.json && !options.progress {
        eprint!("\r                \r");
    }
    // Closing the bus lets the printer drain queued events, then exit.
    drop(agent);
    drop(event_bus);
    if let Some(handle) = progress {
        let _ = handle.await;
    }
    let answer = answer?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&QueryResponse::from(answer))?);
    } else {
        print!("{}", render(&answer, options.trace));
    }

    Ok(())
}

fn progress_line(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::QueryExpanded { queries, fell_back, .. } => Some(if *fell_back {
            "Searching with the question as asked".to_string()
        } else {
            format!("Expanded into {} queries: {}", queries.len(), queries.join(" | "))
        }),
        AgentEvent::HopStarted { hop, tool, args, .. } => Some(format!("Hop {hop}: {tool} {args}")),
        AgentEvent::HopCompleted {
            hop,
            success,
            duration_ms,
            ..
        } => (!success).then(|| format!("Hop {hop} failed after {duration_ms} ms")),
        AgentEvent::Degraded { reason, .. } => Some(format!("Degraded: {reason}")),
        AgentEvent::Answered { .. } => None,
    }
}

/// Human-readable answer: text, sources, then the confidence line.
fn render(answer: &Answer, with_trace: bool) -> String {
    let mut out = format!("{}\n", answer.text);

    if !answer.cited_papers.is_empty() {
        out.push_str("\nSources:\n");
        for paper in &answer.cited_papers {
            out.push_str(&format!("  PMID {}  {}\n", paper.pmid, paper.title));
        }
    }

    if with_trace && !answer.trace.is_empty() {
        out.push_str("\nTrace:\n");
        for hop in &answer.trace {
            let mark = if hop.success { "ok" } else { "failed" };
            out.push_str(&format!(
                "  {}. {}({}) [{mark}] {}\n",
                hop.hop, hop.tool, hop.args, hop.result_summary
            ));
        }
    }

    out.push_str(&format!(
        "\n{} hop(s). {}\n",
        answer.hops,
        answer.confidence.note()
    ));
    out
}
