use std::collections::HashMap;

use rand::Rng;

use crate::utils::crypto::{belongs, hash, Key};

static EXTENSIONS: [&str; 8] = [".c", ".cpp", ".java", ".py", ".txt", ".xml", ".csv", ".json"];

/// Filenames this node is responsible for, keyed by ring position.
/// Values are opaque; only the name and its hash matter to routing.
#[derive(Debug, Default)]
pub struct FileStore {
    files: HashMap<String, Key>,
}

impl FileStore {
    pub fn insert(&mut self, filename: String) -> Key {
        let key = hash(&filename);
        self.files.insert(filename, key);
        key
    }

    /// Removes and returns every filename whose key lies in
    /// `(lower, upper]` on the ring.
    pub fn drain_range(&mut self, lower: Key, upper: Key) -> Vec<String> {
        let claimed: Vec<String> = self
            .files
            .iter()
            .filter(|(_, &key)| belongs(lower, false, upper, true, key))
            .map(|(filename, _)| filename.clone())
            .collect();
        for filename in &claimed {
            self.files.remove(filename);
        }
        claimed
    }

    /// Name/key pairs sorted by filename, for printing and checks.
    pub fn snapshot(&self) -> Vec<(String, Key)> {
        let mut entries: Vec<(String, Key)> = self
            .files
            .iter()
            .map(|(filename, &key)| (filename.clone(), key))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Synthesizes `count` file names to seed the first node of a ring:
/// a capitalized 3-6 letter name plus a random extension.
pub fn random_files(count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let length = rng.gen_range(3..7);
            let name: String = (0..length)
                .map(|i| {
                    let letter = rng.gen_range(b'a'..=b'z') as char;
                    if i == 0 {
                        letter.to_ascii_uppercase()
                    } else {
                        letter
                    }
                })
                .collect();
            let extension = EXTENSIONS[rng.gen_range(0..EXTENSIONS.len())];
            format!("{}{}", name, extension)
        })
        .collect()
}
