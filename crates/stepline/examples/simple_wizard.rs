use stepline::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let wizard = WorkflowController::builder()
        .step(FnStep::new("welcome").on_enter(|| {
            println!("Welcome!");
            Ok(())
        }))
        .step(FnStep::new("name"))
        .step(FnStep::new("done"))
        .on_finish(|| {
            println!("Wizard complete");
            Ok(())
        })
        .build()?;

    loop {
        match wizard.next().await {
            NextOutcome::Advanced { to, .. } => {
                println!("Now on step {} ({})", to, wizard.step_id())
            }
            NextOutcome::Finished => break,
            outcome => {
                println!("Stopped: {:?}", outcome);
                break;
            }
        }
    }

    Ok(())
}
