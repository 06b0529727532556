use anyhow::Result;
use colored::*;
use harrow_core::Runner;

/// Get a consistent color for a task name
fn task_color(name: &str) -> Color {
    // Simple hash of the name bytes for stable colors across runs
    let hash = name
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));

    // Label colors kept away from the conventional log colors
    let colors = [
        Color::TrueColor {
            r: 147,
            g: 112,
            b: 219,
        }, // medium slate blue
        Color::TrueColor {
            r: 64,
            g: 224,
            b: 208,
        }, // turquoise
        Color::TrueColor {
            r: 255,
            g: 140,
            b: 0,
        }, // dark orange
        Color::TrueColor {
            r: 199,
            g: 21,
            b: 133,
        }, // medium violet red
        Color::TrueColor {
            r: 138,
            g: 43,
            b: 226,
        }, // blue violet
    ];

    colors[(hash % colors.len() as u64) as usize]
}

pub fn execute(runner: &Runner, all: bool) -> Result<()> {
    let heading = if all { "Tasks (all)" } else { "Tasks" };
    println!("{}", heading.bold().underline());

    let mut shown = 0;
    for task in runner.tasks() {
        let description = task.description();
        if description.is_none() && !all {
            continue;
        }
        shown += 1;

        let name = task.name().color(task_color(task.name())).bold();
        match description {
            Some(text) => println!("{}  {}", name, text.dimmed()),
            None => println!("{}", name),
        }
    }

    if shown == 0 {
        println!("  {}", "No tasks found".dimmed());
    }

    Ok(())
}
