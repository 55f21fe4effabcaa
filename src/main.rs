use std::error::Error;
use std::sync::Arc;

use structopt::StructOpt;

use log::{info, initialize_logger};
use reviews::config::Settings;
use reviews::db::PgRepository;
use reviews::environment::Environment;
use reviews::review::{Rating, Review, ReviewDraft};
use reviews::storage::FileStorage;
use reviews::tracker::SubmissionTracker;
use reviews::workflow::{thank_you_message, ReviewWorkflow};

#[derive(Debug, StructOpt)]
#[structopt(name = "reviews", about = "Submit and read customer reviews")]
enum Command {
    /// Create the reviews table if it does not exist
    Init,

    /// List approved reviews, newest first
    List {
        /// Print the reviews as JSON
        #[structopt(long)]
        json: bool,
    },

    /// Submit a review
    Submit {
        #[structopt(long)]
        name: String,

        #[structopt(long)]
        email: String,

        /// Between 1 and 5
        #[structopt(long, default_value = "5", parse(try_from_str = parse_rating))]
        rating: Rating,

        #[structopt(long)]
        comment: String,
    },

    /// Check that the review database can be reached
    Ping,

    /// Show what this device remembers about earlier submissions
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let command = Command::from_args();

    let logger = Arc::new(initialize_logger());
    let settings = Settings::from_env()?;

    let storage = Arc::new(FileStorage::new(&settings.storage_path));
    let tracker = Arc::new(SubmissionTracker::new(storage, logger.clone()));

    if let Command::Status = command {
        let record = tracker.load();

        match record.email {
            Some(email) => println!("{} (last used {})", thank_you_message(record.count), email),
            None => println!("No reviews submitted from this device."),
        }

        return Ok(());
    }

    info!(logger, "Connecting to database...");
    let repository = Arc::new(PgRepository::connect(&Settings::connection_string()?).await?);

    if let Command::Init = command {
        info!(logger, "Creating schema...");
        repository.initialize().await?;
        info!(logger, "Completed initialization.");

        return Ok(());
    }

    let environment = Environment::new(logger.clone(), repository, tracker, settings.workflow);
    let mut workflow = ReviewWorkflow::new(environment);

    match command {
        Command::List { json } => {
            workflow.refresh().await;

            if let Some(error) = workflow.error() {
                return Err(error.into());
            }

            print_reviews(workflow.reviews(), json)?;
        }
        Command::Submit {
            name,
            email,
            rating,
            comment,
        } => {
            let draft = ReviewDraft::new(name, email, rating, comment);
            let receipt = workflow
                .submit(draft)
                .await
                .map_err(|e| e.user_message())?;

            println!("{}", receipt.message());
        }
        Command::Ping => {
            if !workflow.check_connection().await {
                return Err(workflow.error().unwrap_or("Store unreachable").into());
            }

            println!("Database reachable.");
        }
        Command::Init | Command::Status => {}
    }

    Ok(())
}

fn parse_rating(raw: &str) -> Result<Rating, String> {
    let stars: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{:?} is not a number", raw))?;

    Rating::new(stars).map_err(|e| e.to_string())
}

fn print_reviews(reviews: &[Review], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(reviews)?);
        return Ok(());
    }

    if reviews.is_empty() {
        println!("No reviews yet.");
    }

    for review in reviews {
        let stars = usize::from(review.rating().stars());

        println!(
            "{}{} {} ({})\n  {}\n",
            "★".repeat(stars),
            "☆".repeat(usize::from(Rating::MAX) - stars),
            review.name(),
            review.display_date(),
            review.comment()
        );
    }

    Ok(())
}
