//! Inspect command implementation.

use ledgersync_crdt::MerkleTrie;
use ledgersync_server::load_digest;
use ledgersync_storage::{FileRegistry, GroupStore};
use serde::Serialize;

/// Digest inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File inspected.
    pub file_id: String,
    /// Group the digest belongs to.
    pub group_id: Option<String>,
    /// Whether a digest is stored.
    pub stored: bool,
    /// Root hash.
    pub root_hash: u32,
    /// Number of nodes, root included.
    pub node_count: usize,
    /// Longest key path.
    pub depth: usize,
    /// Nodes down to the requested depth, as `(path, hash)`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<(String, u32)>,
}

/// Loads and summarizes the digest of `file_id`.
pub fn inspect<S>(
    storage: &S,
    file_id: &str,
    tree_depth: usize,
) -> Result<InspectResult, Box<dyn std::error::Error>>
where
    S: GroupStore + FileRegistry,
{
    let group_id = storage.file(file_id)?.and_then(|file| file.group_id);
    let digest = load_digest(storage, file_id)?;
    let trie = digest.clone().unwrap_or_default();

    let mut nodes = Vec::new();
    if tree_depth > 0 {
        collect_nodes(&trie, String::new(), tree_depth, &mut nodes);
    }

    Ok(InspectResult {
        file_id: file_id.to_string(),
        group_id,
        stored: digest.is_some(),
        root_hash: trie.hash(),
        node_count: trie.node_count(),
        depth: trie.depth(),
        nodes,
    })
}

fn collect_nodes(node: &MerkleTrie, path: String, remaining: usize, out: &mut Vec<(String, u32)>) {
    if remaining == 0 {
        return;
    }
    for key in node.keys() {
        if let Some(child) = node.child(key) {
            let mut child_path = path.clone();
            child_path.push(key);
            out.push((child_path.clone(), child.hash()));
            collect_nodes(child, child_path, remaining - 1, out);
        }
    }
}

/// Runs the inspect command.
pub fn run<S>(
    storage: &S,
    file_id: &str,
    tree_depth: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: GroupStore + FileRegistry,
{
    let result = inspect(storage, file_id, tree_depth)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("File: {}", result.file_id);
    println!("  Group:      {}", result.group_id.as_deref().unwrap_or("-"));
    if !result.stored {
        println!("  No digest stored");
        return;
    }
    println!("  Root hash:  {} ({})", result.root_hash, result.root_hash as i32);
    println!("  Nodes:      {}", result.node_count);
    println!("  Depth:      {}", result.depth);

    if !result.nodes.is_empty() {
        println!();
        for (path, hash) in &result.nodes {
            println!("  {:indent$}{} {}", "", path, hash, indent = path.len() * 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_crdt::Timestamp;
    use ledgersync_storage::{InMemoryStorage, NewFile, StorageResult};

    #[test]
    fn summarizes_stored_digest() {
        let storage = InMemoryStorage::new();
        storage.add(NewFile::new("f1", "g1", 2)).unwrap();
        let trie = MerkleTrie::new()
            .insert(&Timestamp::parse("2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF").unwrap());
        storage
            .transaction("f1", |txn| -> StorageResult<()> {
                txn.upsert("g1", &trie.to_json().unwrap())
            })
            .unwrap();

        let result = inspect(&storage, "f1", 2).unwrap();
        assert!(result.stored);
        assert_eq!(result.group_id.as_deref(), Some("g1"));
        assert_eq!(result.root_hash, 1_983_295_247);
        assert_eq!(result.node_count, 17);
        assert_eq!(result.depth, 16);
        assert_eq!(
            result.nodes,
            vec![
                ("1".to_string(), 1_983_295_247),
                ("12".to_string(), 1_983_295_247)
            ]
        );
    }

    #[test]
    fn missing_digest() {
        let storage = InMemoryStorage::new();
        storage.add(NewFile::new("f1", "g1", 2)).unwrap();

        let result = inspect(&storage, "f1", 0).unwrap();
        assert!(!result.stored);
        assert_eq!(result.node_count, 1);
        assert!(result.nodes.is_empty());
    }
}
