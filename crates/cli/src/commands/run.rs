use anyhow::Result;
use colored::*;
use harrow_core::Runner;

pub async fn execute(runner: &mut Runner, targets: &[String]) -> Result<()> {
    let targets = if targets.is_empty() {
        vec!["default".to_string()]
    } else {
        targets.to_vec()
    };

    println!("{} {}", "Running".bold(), targets.join(", ").cyan());
    println!();

    if let Err(err) = runner.run_targets(&targets).await {
        let chain = err.chain();
        if chain.len() > 1 {
            eprintln!(
                "{} {}",
                "invocation chain:".bright_black(),
                chain.join(" <- ").yellow()
            );
        }
        return Err(anyhow::anyhow!("{}", err));
    }

    println!();
    println!(
        "{} {}",
        "✓".green().bold(),
        "All tasks completed successfully!".green().bold()
    );

    Ok(())
}
