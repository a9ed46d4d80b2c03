use std::path::PathBuf;

use clap::Subcommand;
use projplan_core::velocity::{breakeven_between, extrapolate, Extrapolation, ExtrapolationParams};
use projplan_core::Roadmap;

use super::schedule_file;

#[derive(Subcommand)]
pub enum VelocityAction {
    /// Extrapolate one focus area's completion curve
    Extrapolate {
        /// Scenario TOML file
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        focus_area: String,
        /// Effort at which the projection ends
        #[arg(long)]
        horizon: f64,
        /// Relative productivity change at the end of the transition
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        delta: f64,
        #[arg(long, default_value_t = 4)]
        steps: u32,
        #[arg(long, default_value_t = 10.0)]
        final_len: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find where two focus areas' projected curves come closest
    Breakeven {
        /// Scenario TOML file
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        first: String,
        #[arg(long)]
        second: String,
        #[arg(long)]
        horizon: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        first_delta: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        second_delta: f64,
        #[arg(long, default_value_t = 4)]
        steps: u32,
        #[arg(long, default_value_t = 10.0)]
        final_len: f64,
    },
}

fn project(
    roadmap: &Roadmap,
    focus_area: &str,
    params: &ExtrapolationParams,
) -> Result<Extrapolation, Box<dyn std::error::Error>> {
    let curve = roadmap
        .velocity_curve(focus_area)
        .ok_or_else(|| format!("'{focus_area}' is not a schedulable focus area of this scenario"))?;
    Ok(extrapolate(&curve, params)?)
}

pub fn run(action: VelocityAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        VelocityAction::Extrapolate {
            config,
            focus_area,
            horizon,
            delta,
            steps,
            final_len,
            json,
        } => {
            let (_, roadmap) = schedule_file(&config)?;
            let params = ExtrapolationParams::new(horizon)
                .with_delta(delta)
                .with_steps(steps)
                .with_final_len(final_len);
            let projection = project(&roadmap, &focus_area, &params)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&projection)?);
            } else {
                println!(
                    "{focus_area}: velocity {:.4} tasks per effort unit",
                    projection.fit.slope.max(0.0)
                );
                for (effort, completed) in projection.resampled.iter().enumerate() {
                    println!("{effort:>6}  {completed:.3}");
                }
            }
        }
        VelocityAction::Breakeven {
            config,
            first,
            second,
            horizon,
            first_delta,
            second_delta,
            steps,
            final_len,
        } => {
            let (_, roadmap) = schedule_file(&config)?;
            let params = ExtrapolationParams::new(horizon)
                .with_steps(steps)
                .with_final_len(final_len);
            let a = project(&roadmap, &first, &params.with_delta(first_delta))?;
            let b = project(&roadmap, &second, &params.with_delta(second_delta))?;

            match breakeven_between(&a, &b) {
                Some(x) => println!(
                    "breakeven at effort {x}: {first}={:.3}, {second}={:.3}",
                    a.resampled[x], b.resampled[x]
                ),
                None => println!("no breakeven: horizon too short"),
            }
        }
    }
    Ok(())
}
