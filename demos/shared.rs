use std::sync::Arc;

use tasksync::client::HttpClient;
use tasksync::config::Config;
use tasksync::session::{FileSessionStore, Session};
use tasksync::TaskSyncClient;


/// Connects to the store described by the environment (see `Config::from_env`), and loads its tasks
pub async fn initial_load() -> TaskSyncClient<HttpClient> {
    let config = Config::from_env().unwrap();
    println!("This will use the following settings:");
    println!("  * URL = {}", config.base_url);
    println!("  * auth = {:?}, dates = {:?}", config.auth_policy, config.date_policy);

    let http = HttpClient::from_config(&config).unwrap();
    let session_store = match FileSessionStore::from_file(&config.session_file) {
        Ok(store) => store,
        Err(err) => {
            log::warn!("Invalid session file: {}. Starting logged out", err);
            FileSessionStore::new(&config.session_file)
        }
    };
    let session = Arc::new(Session::new(Box::new(session_store)));
    let client = TaskSyncClient::from_config(http, &config, session);

    if let (Ok(email), Ok(password)) = (std::env::var("TASKSYNC_EMAIL"), std::env::var("TASKSYNC_PASSWORD")) {
        client.login(client.store(), &email, &password).await.unwrap();
    }

    println!("Loading tasks...");
    match client.load_all().await {
        Ok(tasks) => {
            println!("---- Tasks -----");
            tasksync::utils::print_task_list(&tasks);
        },
        Err(err) => log::warn!("Unable to load tasks: {}. You may need to log in (set TASKSYNC_EMAIL and TASKSYNC_PASSWORD)", err),
    }

    client
}
