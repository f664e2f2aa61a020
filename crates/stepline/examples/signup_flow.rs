//! Account signup flow with an async validation guard.
//!
//! Demonstrates:
//! - Implementing `Step` on a struct with its own state
//! - Async guards that block advancement
//! - Optional steps and `skip`
//! - Jumping back to an earlier step by id

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stepline::prelude::*;

#[derive(Debug, Default, Clone)]
struct SignupForm {
    email: String,
    password: String,
    newsletter: bool,
}

type SharedForm = Arc<Mutex<SignupForm>>;

// Step 1: Email, validated against a (simulated) remote service
#[derive(Debug)]
struct EmailStep {
    id: StepId,
    form: SharedForm,
    taken: Vec<String>,
}

#[async_trait]
impl Step for EmailStep {
    fn id(&self) -> &StepId {
        &self.id
    }

    fn on_enter(&self) -> Result<(), WorkflowError> {
        println!("Enter your email address");
        Ok(())
    }

    async fn on_next(&self) -> Result<bool, WorkflowError> {
        let email = self
            .form
            .lock()
            .map_err(|_| WorkflowError::StepError {
                step_id: self.id.clone(),
                details: "form lock poisoned".to_string(),
            })?
            .email
            .clone();

        // Simulate a round trip to the account service
        tokio::time::sleep(Duration::from_millis(50)).await;

        if !email.contains('@') {
            println!("'{}' is not a valid email", email);
            return Ok(false);
        }
        if self.taken.contains(&email) {
            println!("'{}' is already registered", email);
            return Ok(false);
        }
        Ok(true)
    }

    fn guard_timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(2))
    }
}

// Step 2: Password with a synchronous strength check
fn password_step(form: SharedForm) -> FnStep {
    FnStep::new("password").on_next_sync(move || {
        let form = form.lock().map_err(|_| WorkflowError::StepError {
            step_id: StepId::new("password"),
            details: "form lock poisoned".to_string(),
        })?;
        Ok(form.password.len() >= 8)
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let form = SharedForm::default();
    let wizard = WorkflowController::builder()
        .step(EmailStep {
            id: StepId::new("email"),
            form: form.clone(),
            taken: vec!["alice@example.com".to_string()],
        })
        .step(password_step(form.clone()))
        .step(FnStep::new("newsletter").optional(true))
        .step(FnStep::new("confirm").on_exit(|| {
            println!("Leaving confirmation");
            Ok(())
        }))
        .on_finish(|| {
            println!("Account created");
            Ok(())
        })
        .on_error(|e| eprintln!("signup error: {}", e))
        .build()?;

    if let Ok(mut f) = form.lock() {
        f.email = "alice@example.com".to_string();
    }
    println!("{:?}", wizard.next().await);

    if let Ok(mut f) = form.lock() {
        f.email = "bob@example.com".to_string();
        f.password = "correct horse".to_string();
    }
    println!("{:?}", wizard.next().await);
    println!("{:?}", wizard.next().await);

    // Newsletter is optional
    println!("{:?}", wizard.skip()?);

    // Change the email before confirming
    wizard.go_to("email")?;
    println!("Back on '{}', previous step {:?}", wizard.step_id(), wizard.previous_step());
    wizard.go_to("confirm")?;

    println!("{:?}", wizard.next().await);
    println!("{}", serde_json::to_string_pretty(&wizard.status())?);

    Ok(())
}
