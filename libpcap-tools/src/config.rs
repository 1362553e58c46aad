use crate::context::DEFAULT_SNAPLEN;
use std::io;

/// Initial size of the parser buffer
pub const BUFFER_INITIAL_CAPACITY: usize = 128 * 1024;
/// The parser buffer never grows beyond this size
pub const BUFFER_MAX_SIZE: usize = 16 * 1024 * 1024;

pub struct Config {
    value: toml::Value,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            value: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Config {
    fn lookup<T: AsRef<str>>(&self, k: T) -> Option<&toml::Value> {
        let mut item = &self.value;
        for key in k.as_ref().split('.') {
            item = item.get(key)?;
        }
        Some(item)
    }

    /// Get an entry by path. If the input argument contains dots, the path is split
    /// into keys, each key being requested recursively.
    pub fn get<T: AsRef<str>>(&self, k: T) -> Option<&str> {
        self.lookup(k)?.as_str()
    }

    /// Get an entry of type integer by path
    pub fn get_usize<T: AsRef<str>>(&self, k: T) -> Option<usize> {
        self.lookup(k)?
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
    }

    /// Get an entry of type boolean by path
    pub fn get_bool<T: AsRef<str>>(&self, k: T) -> Option<bool> {
        self.lookup(k)?.as_bool()
    }

    /// Set an entry by path, creating intermediate tables when needed.
    ///
    /// Returns `false` if an intermediate key exists and is not a table.
    pub fn set<T: AsRef<str>, V: Into<toml::Value>>(&mut self, k: T, v: V) -> bool {
        let mut keys: Vec<&str> = k.as_ref().split('.').collect();
        let last = match keys.pop() {
            Some(last) => last,
            None => return false,
        };
        let mut item = &mut self.value;
        for key in keys {
            let table = match item.as_table_mut() {
                Some(t) => t,
                None => return false,
            };
            item = table
                .entry(key.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        match item.as_table_mut() {
            Some(t) => {
                t.insert(last.to_string(), v.into());
                true
            }
            None => false,
        }
    }

    /// Load configuration from input object. If keys are already present, they are overwritten
    pub fn load_config<R: io::Read>(&mut self, mut config: R) -> Result<(), io::Error> {
        let mut s = String::new();
        config.read_to_string(&mut s)?;
        match toml::from_str::<toml::Table>(&s) {
            Ok(table) => {
                self.value = toml::Value::Table(table);
                Ok(())
            }
            Err(e) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Load configuration failed: {e}"),
            )),
        }
    }

    pub fn buffer_initial_capacity(&self) -> usize {
        self.get_usize("buffer_initial_capacity")
            .unwrap_or(BUFFER_INITIAL_CAPACITY)
    }

    pub fn buffer_max_size(&self) -> usize {
        self.get_usize("buffer_max_size").unwrap_or(BUFFER_MAX_SIZE)
    }

    /// Snapshot length substituted when the input declares none
    pub fn default_snaplen(&self) -> u32 {
        self.get_usize("default_snaplen")
            .and_then(|v| u32::try_from(v).ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_SNAPLEN)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn load_and_get() {
        let mut config = Config::default();
        let data = "default_snaplen = 4096\nstrict_snaplen = true\n[output]\nname = \"x\"\n";
        config.load_config(data.as_bytes()).unwrap();
        assert_eq!(config.get_usize("default_snaplen"), Some(4096));
        assert_eq!(config.get_bool("strict_snaplen"), Some(true));
        assert_eq!(config.get("output.name"), Some("x"));
        assert_eq!(config.get("output.missing"), None);
        assert_eq!(config.get_usize("strict_snaplen"), None);
    }

    #[test]
    fn negative_integer_is_not_usize() {
        let mut config = Config::default();
        config.load_config("buffer_max_size = -1".as_bytes()).unwrap();
        assert_eq!(config.get_usize("buffer_max_size"), None);
        assert_eq!(config.buffer_max_size(), super::BUFFER_MAX_SIZE);
    }

    #[test]
    fn set_nested() {
        let mut config = Config::default();
        assert!(config.set("a.b", "c"));
        assert!(config.set("level", 3i64));
        assert_eq!(config.get("a.b"), Some("c"));
        assert_eq!(config.get_usize("level"), Some(3));
        // "level" is not a table
        assert!(!config.set("level.x", true));
    }

    #[test]
    fn invalid_toml() {
        let mut config = Config::default();
        let err = config.load_config("a = [".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
