/// Anything that lives under a name inside one config file and renders to
/// its own lines, e.g. `repo foo` blocks and `@group = ...` lines.
pub trait ConfEntity {
    /// The key the entity is stored under (group names without the marker).
    fn conf_name(&self) -> &str;

    /// Append the entity's canonical lines to `out`, newline terminated.
    fn write_conf(&self, out: &mut String);

    /// Convenience wrapper around [`ConfEntity::write_conf`].
    fn to_conf(&self) -> String {
        let mut out = String::new();
        self.write_conf(&mut out);
        out
    }
}
