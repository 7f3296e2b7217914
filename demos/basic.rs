//! This is an example of how tasksync can be used.
//! It loads the tasks of a remote store, then adds one and follows what happens on a feedback channel.

use chrono::{Duration, Local};

use tasksync::progress::feedback_channel;
use tasksync::TaskDraft;

mod shared;
use shared::initial_load;


#[tokio::main]
async fn main() {
    env_logger::init();

    let client = initial_load().await;
    let (sender, mut receiver) = feedback_channel();
    let client = client.with_feedback(sender);

    let watcher = tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            println!("  > {}", *receiver.borrow());
        }
    });

    let today = Local::now().date_naive();
    let draft = TaskDraft::new("Try tasksync")
        .scheduled(today)
        .due(today + Duration::days(7));
    match client.create(draft).await {
        Ok(task) => println!("Created {}", task.id()),
        Err(err) => log::error!("Unable to create a task: {}", err),
    }

    println!("---- Tasks -----");
    tasksync::utils::print_task_list(&client.tasks());

    // Closes the feedback channel
    drop(client);
    let _ = watcher.await;
}
