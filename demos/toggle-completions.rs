//! This is an example of how tasksync can be used.
//! This binary simply toggles all completion statuses of the tasks it finds.

use std::error::Error;

use tasksync::client::HttpClient;
use tasksync::utils::pause;
use tasksync::TaskSyncClient;

mod shared;
use shared::initial_load;


#[tokio::main]
async fn main() {
    env_logger::init();

    println!("This example toggles the completion status of every task of a remote store.");
    println!("Set the TASKSYNC_URL environment variable to the root of your service.");
    println!("You can also set the RUST_LOG environment variable to display more info about the requests.");
    println!("");
    let client = initial_load().await;
    pause();

    toggle_all_tasks(&client).await.unwrap();
}

async fn toggle_all_tasks(client: &TaskSyncClient<HttpClient>) -> Result<(), Box<dyn Error>> {
    let mut n_toggled = 0;

    for task in client.tasks() {
        match client.toggle_completed(task.id()).await {
            Ok(_) => n_toggled += 1,
            // Local data is untouched, the other tasks can still be toggled
            Err(err) => println!("Unable to toggle {}: {}", task.id(), err),
        }
    }
    println!("{} tasks toggled.", n_toggled);

    println!("---- Tasks, after the changes -----");
    tasksync::utils::print_task_list(&client.tasks());
    Ok(())
}
