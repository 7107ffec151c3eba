//! Access to the parts of an Office Open XML package.

use crate::error::EnrichError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::ZipArchive;

type PartReader<'a, RS> = XmlReader<BufReader<ZipFile<'a, RS>>>;

/// Looks up package parts by their part name.
///
/// Part names are compared ASCII case-insensitively, a leading `/` is ignored
/// and backslashes written by some producers count as `/`.
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Archive index of the part, if present.
    fn part_index(&self, name: &str) -> Option<usize>;

    /// Streams the part as XML, or `None` when the package lacks it.
    fn xml_reader(&'_ mut self, name: &str) -> Result<Option<PartReader<'_, RS>>, EnrichError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn part_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_part_name(name);
        (0..self.len()).find(|index| {
            self.name_for_index(*index)
                .map(|entry| normalize_part_name(entry).eq_ignore_ascii_case(&wanted))
                .unwrap_or(false)
        })
    }

    fn xml_reader(&'_ mut self, name: &str) -> Result<Option<PartReader<'_, RS>>, EnrichError> {
        match self.part_index(name) {
            Some(index) => Ok(Some(XmlReader::new(BufReader::new(self.by_index(index)?)))),
            None => Ok(None),
        }
    }
}

fn normalize_part_name(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_owned()
}
