use crate::error::Result;
use msdprep::core::cluster::ClusterIdentifier;

pub fn run(identifier: &ClusterIdentifier) -> Result<()> {
    let cluster = identifier.identify();
    println!("Cluster:   {}", cluster);
    match cluster.scheduler() {
        Some(scheduler) => {
            println!("Scheduler: {}", scheduler);
            println!("Queue:     {}", cluster.default_queue());
        }
        None => println!("Scheduler: none (jobs cannot be prepared here without --masquerade)"),
    }
    Ok(())
}
