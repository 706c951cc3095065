//src/taxdb.rs

use std::io::BufRead;
use std::path::Path;

use ahash::{AHashMap, AHashSet};

use crate::error::TaxonomyError;
use crate::input::open_lines;
use crate::types::{Rank, Taxon};

/// Read-only taxonomy held as an arena of `Taxon` records.
///
/// Parents are stored as ids and looked up through `index`, so the tree can be
/// shared between worker threads behind a plain `Arc`. Merged aliases are
/// collapsed at build time: every alias points straight at a canonical id.
#[derive(Debug)]
pub struct TaxonomyTree {
    nodes: Vec<Taxon>,
    index: AHashMap<u32, usize>,
    merged: AHashMap<u32, u32>,
    deleted: AHashSet<u32>,
    root: u32,
}

impl TaxonomyTree {
    /// Build and validate a tree.
    ///
    /// Fails on a missing or duplicated root, a parent id that is not a node,
    /// or any cycle in the parent or merged relations. A merged entry whose
    /// chain does not end at a node is dropped with a warning.
    pub fn build(
        nodes: Vec<Taxon>,
        merged: Vec<(u32, u32)>,
        deleted: Vec<u32>,
    ) -> Result<Self, TaxonomyError> {
        let mut arena: Vec<Taxon> = Vec::with_capacity(nodes.len());
        let mut index: AHashMap<u32, usize> = AHashMap::with_capacity(nodes.len());

        for taxon in nodes {
            match index.get(&taxon.id) {
                Some(&i) => {
                    log::warn!("Duplicate taxon {} in nodes table, keeping the last entry", taxon.id);
                    arena[i] = taxon;
                }
                None => {
                    index.insert(taxon.id, arena.len());
                    arena.push(taxon);
                }
            }
        }

        // 1. Exactly one root, whatever rank the snapshot gave it.
        let mut root: Option<u32> = None;
        for taxon in arena.iter_mut() {
            if taxon.parent_id == taxon.id {
                if let Some(first) = root {
                    return Err(TaxonomyError::MultipleRoots { first, second: taxon.id });
                }
                root = Some(taxon.id);
                taxon.rank = Rank::Root;
            }
        }
        let root = root.ok_or(TaxonomyError::MissingRoot)?;

        // 2. Every parent must exist.
        for taxon in &arena {
            if !index.contains_key(&taxon.parent_id) {
                return Err(TaxonomyError::DanglingParent {
                    taxon: taxon.id,
                    parent: taxon.parent_id,
                });
            }
        }

        // 3. Every parent chain must reach the root.
        check_acyclic(&arena, &index)?;

        // 4. Collapse merged chains onto canonical ids.
        let raw_merged: AHashMap<u32, u32> = merged.into_iter().collect();
        let mut collapsed: AHashMap<u32, u32> = AHashMap::with_capacity(raw_merged.len());
        for (&old, &new) in &raw_merged {
            if index.contains_key(&old) {
                log::debug!("Merged id {old} is also a live node, ignoring the alias");
                continue;
            }
            let mut current = new;
            let mut hops = 0usize;
            while !index.contains_key(&current) {
                match raw_merged.get(&current) {
                    Some(&next) => current = next,
                    None => break,
                }
                hops += 1;
                if hops > raw_merged.len() {
                    return Err(TaxonomyError::CycleDetected { taxon: old });
                }
            }
            if index.contains_key(&current) {
                collapsed.insert(old, current);
            } else {
                log::warn!("Merged id {old} points at unknown taxon {current}, dropping the alias");
            }
        }

        let deleted: AHashSet<u32> = deleted
            .into_iter()
            .filter(|id| !index.contains_key(id))
            .collect();

        Ok(Self {
            nodes: arena,
            index,
            merged: collapsed,
            deleted,
            root,
        })
    }

    /// Follow merged aliases to a canonical id.
    pub fn resolve(&self, raw_id: u32) -> Result<u32, TaxonomyError> {
        if self.index.contains_key(&raw_id) {
            return Ok(raw_id);
        }
        if let Some(&canonical) = self.merged.get(&raw_id) {
            return Ok(canonical);
        }
        if self.deleted.contains(&raw_id) {
            return Err(TaxonomyError::DeletedTaxon(raw_id));
        }
        Err(TaxonomyError::UnknownTaxon(raw_id))
    }

    /// Look up a canonical id. Aliases are not followed.
    pub fn get(&self, id: u32) -> Option<&Taxon> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Resolve `raw_id` and return its node.
    pub fn taxon(&self, raw_id: u32) -> Result<&Taxon, TaxonomyError> {
        let id = self.resolve(raw_id)?;
        self.get(id).ok_or(TaxonomyError::UnknownTaxon(raw_id))
    }

    /// The path from `raw_id` up to the root, both ends included.
    pub fn ancestors(&self, raw_id: u32) -> Result<Vec<&Taxon>, TaxonomyError> {
        let mut node = self.taxon(raw_id)?;
        let mut path = Vec::with_capacity(16);
        loop {
            path.push(node);
            if node.id == self.root {
                break;
            }
            // Parents were checked at build time.
            match self.get(node.parent_id) {
                Some(parent) => node = parent,
                None => break,
            }
        }
        Ok(path)
    }

    pub fn rank_of(&self, raw_id: u32) -> Result<Rank, TaxonomyError> {
        Ok(self.taxon(raw_id)?.rank)
    }

    pub fn name_of(&self, raw_id: u32) -> Option<&str> {
        self.taxon(raw_id).ok().map(|t| t.name.as_str())
    }

    /// True if `ancestor` is a proper ancestor of `descendant`.
    pub fn is_ancestor(&self, ancestor: u32, descendant: u32) -> bool {
        let (Ok(ancestor), Ok(descendant)) = (self.resolve(ancestor), self.resolve(descendant)) else {
            return false;
        };
        if ancestor == descendant {
            return false;
        }
        self.ancestors(descendant)
            .map(|path| path.iter().any(|t| t.id == ancestor))
            .unwrap_or(false)
    }

    /// The first node at `rank` on the way from `raw_id` to the root.
    pub fn ancestor_at_rank(&self, raw_id: u32, rank: Rank) -> Option<&Taxon> {
        self.ancestors(raw_id)
            .ok()?
            .into_iter()
            .find(|t| t.rank == rank)
    }

    /// Lowest common ancestor of two taxa.
    pub fn lca(&self, a: u32, b: u32) -> Result<u32, TaxonomyError> {
        let a_anc: AHashSet<u32> = self.ancestors(a)?.iter().map(|t| t.id).collect();
        for taxon in self.ancestors(b)? {
            if a_anc.contains(&taxon.id) {
                return Ok(taxon.id);
            }
        }
        Ok(self.root)
    }

    /// Lowest common ancestor of a set of taxa. `None` for an empty set.
    pub fn lca_of<I>(&self, ids: I) -> Result<Option<u32>, TaxonomyError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut iter = ids.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut candidate = self.resolve(first)?;
        for id in iter {
            candidate = self.lca(candidate, id)?;
        }
        Ok(Some(candidate))
    }

    pub fn root(&self) -> u32 {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn merged_count(&self) -> usize {
        self.merged.len()
    }
}

/// Walk every parent chain once; a chain that revisits a node still on the
/// current walk is a cycle.
fn check_acyclic(arena: &[Taxon], index: &AHashMap<u32, usize>) -> Result<(), TaxonomyError> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; arena.len()];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..arena.len() {
        let mut i = start;
        path.clear();
        loop {
            match state[i] {
                DONE => break,
                ON_PATH => return Err(TaxonomyError::CycleDetected { taxon: arena[i].id }),
                _ => {}
            }
            state[i] = ON_PATH;
            path.push(i);
            let taxon = &arena[i];
            if taxon.parent_id == taxon.id {
                break;
            }
            match index.get(&taxon.parent_id) {
                Some(&p) => i = p,
                None => break,
            }
        }
        for &j in &path {
            state[j] = DONE;
        }
    }
    Ok(())
}

// -----------------------
// Loaders
// -----------------------

/// Feed every non-empty line of `path` to `f`, turning its error string into a
/// `TaxonomyError::Parse` with the line number.
fn for_each_line<P, F>(path: P, mut f: F) -> Result<(), TaxonomyError>
where
    P: AsRef<Path>,
    F: FnMut(&str) -> Result<(), String>,
{
    let path = path.as_ref();
    let io_err = |source| TaxonomyError::Io { path: path.to_path_buf(), source };
    let reader = open_lines(path).map_err(io_err)?;
    for (n, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        f(&line).map_err(|message| TaxonomyError::Parse {
            path: path.to_path_buf(),
            line: n + 1,
            message,
        })?;
    }
    Ok(())
}

fn parse_id(field: &str, what: &str) -> Result<u32, String> {
    field
        .trim()
        .parse()
        .map_err(|_| format!("invalid {what} '{}'", field.trim()))
}

/// Split an NCBI `*.dmp` line (`a\t|\tb\t|\t...\t|`) into trimmed fields.
fn dmp_fields(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\t', '|', '\n', '\r'])
        .split('|')
        .map(str::trim)
        .collect()
}

/// Parses a taxDB file in the format:
/// ```text
/// <taxid>\t<parentid>\t<taxname>\t<rank>
/// ```
/// Lines with fewer than four fields are skipped.
pub fn parse_taxdb<P: AsRef<Path>>(filepath: P) -> Result<Vec<Taxon>, TaxonomyError> {
    let mut nodes = Vec::new();
    for_each_line(filepath, |line| {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 4 {
            return Ok(());
        }
        nodes.push(Taxon {
            id: parse_id(parts[0], "taxid")?,
            parent_id: parse_id(parts[1], "parent id")?,
            name: parts[2].trim().to_string(),
            rank: parts[3].parse().unwrap_or(Rank::NoRank),
        });
        Ok(())
    })?;
    Ok(nodes)
}

/// Reads `old_id <sep> new_id` pairs from an NCBI `merged.dmp` or a plain
/// two-column tab-separated file.
pub fn parse_merged<P: AsRef<Path>>(filepath: P) -> Result<Vec<(u32, u32)>, TaxonomyError> {
    let mut pairs = Vec::new();
    for_each_line(filepath, |line| {
        let fields = dmp_fields(line);
        let fields: Vec<&str> = if fields.len() >= 2 {
            fields
        } else {
            line.split('\t').map(str::trim).collect()
        };
        if fields.len() < 2 {
            return Err("expected two columns: old id, new id".to_string());
        }
        pairs.push((parse_id(fields[0], "old id")?, parse_id(fields[1], "new id")?));
        Ok(())
    })?;
    Ok(pairs)
}

/// Reads the id column of an NCBI `delnodes.dmp`.
pub fn parse_delnodes<P: AsRef<Path>>(filepath: P) -> Result<Vec<u32>, TaxonomyError> {
    let mut ids = Vec::new();
    for_each_line(filepath, |line| {
        let fields = dmp_fields(line);
        ids.push(parse_id(fields[0], "taxid")?);
        Ok(())
    })?;
    Ok(ids)
}

/// Reads an NCBI `nodes.dmp`. Names are left empty; see `parse_ncbi_names`.
pub fn parse_ncbi_nodes<P: AsRef<Path>>(filepath: P) -> Result<Vec<Taxon>, TaxonomyError> {
    let mut nodes = Vec::new();
    for_each_line(filepath, |line| {
        let fields = dmp_fields(line);
        if fields.len() < 3 {
            return Err("expected at least three columns: taxid, parent, rank".to_string());
        }
        nodes.push(Taxon {
            id: parse_id(fields[0], "taxid")?,
            parent_id: parse_id(fields[1], "parent id")?,
            rank: fields[2].parse().unwrap_or(Rank::NoRank),
            name: String::new(),
        });
        Ok(())
    })?;
    Ok(nodes)
}

/// Reads the scientific names from an NCBI `names.dmp`.
pub fn parse_ncbi_names<P: AsRef<Path>>(filepath: P) -> Result<AHashMap<u32, String>, TaxonomyError> {
    let mut names = AHashMap::new();
    for_each_line(filepath, |line| {
        let fields = dmp_fields(line);
        if fields.len() < 4 {
            return Err("expected four columns: taxid, name, unique name, class".to_string());
        }
        if fields[3] == "scientific name" {
            names.insert(parse_id(fields[0], "taxid")?, fields[1].to_string());
        }
        Ok(())
    })?;
    Ok(names)
}

/// Locate `<dir>/<name>` or `<dir>/<name>.gz`.
fn find_dump(dir: &Path, name: &str) -> Option<std::path::PathBuf> {
    let plain = dir.join(name);
    if plain.exists() {
        return Some(plain);
    }
    let gz = dir.join(format!("{name}.gz"));
    gz.exists().then_some(gz)
}

/// Load a taxonomy from an NCBI dump directory.
///
/// `nodes.dmp` is required; `names.dmp`, `merged.dmp` and `delnodes.dmp` are
/// used when present.
pub fn load_ncbi_dir<P: AsRef<Path>>(dir: P) -> Result<TaxonomyTree, TaxonomyError> {
    let dir = dir.as_ref();
    let nodes_path = find_dump(dir, "nodes.dmp").ok_or_else(|| TaxonomyError::Io {
        path: dir.join("nodes.dmp"),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "nodes.dmp not found"),
    })?;

    let mut nodes = parse_ncbi_nodes(nodes_path)?;
    if let Some(names_path) = find_dump(dir, "names.dmp") {
        let mut names = parse_ncbi_names(names_path)?;
        for taxon in nodes.iter_mut() {
            if let Some(name) = names.remove(&taxon.id) {
                taxon.name = name;
            }
        }
    }
    let merged = match find_dump(dir, "merged.dmp") {
        Some(p) => parse_merged(p)?,
        None => Vec::new(),
    };
    let deleted = match find_dump(dir, "delnodes.dmp") {
        Some(p) => parse_delnodes(p)?,
        None => Vec::new(),
    };

    let tree = TaxonomyTree::build(nodes, merged, deleted)?;
    log::info!(
        "Loaded taxonomy from {}: {} nodes, {} merged aliases",
        dir.display(),
        tree.len(),
        tree.merged_count()
    );
    Ok(tree)
}

/// Load a taxonomy from a taxDB file plus an optional merged table.
pub fn load_taxdb<P: AsRef<Path>>(
    taxdb_path: P,
    merged_path: Option<&Path>,
) -> Result<TaxonomyTree, TaxonomyError> {
    let nodes = parse_taxdb(&taxdb_path)?;
    let merged = match merged_path {
        Some(p) => parse_merged(p)?,
        None => Vec::new(),
    };
    let tree = TaxonomyTree::build(nodes, merged, Vec::new())?;
    log::info!(
        "Loaded taxonomy from {}: {} nodes, {} merged aliases",
        taxdb_path.as_ref().display(),
        tree.len(),
        tree.merged_count()
    );
    Ok(tree)
}

/// Small two-domain tree used by tests across the crate.
///
/// ```text
/// 1 root
/// ├── 2 Bacteria (superkingdom)
/// │   └── 10 Proteobacteria (phylum)
/// │       └── 20 Gammaproteobacteria (class)
/// │           └── 30 Enterobacterales (order)
/// │               └── 40 Enterobacteriaceae (family)
/// │                   ├── 50 Escherichia (genus)
/// │                   │   ├── 100 Escherichia coli (species)
/// │                   │   │   └── 200 E. coli K-12 (no rank)
/// │                   │   └── 101 Escherichia fergusonii (species)
/// │                   └── 51 Salmonella (genus)
/// │                       └── 102 Salmonella enterica (species)
/// └── 3 Archaea (superkingdom)
///     └── 60 Euryarchaeota (phylum)
///         └── 300 Methanobrevibacter smithii (species)
/// ```
/// Merged: 999 -> 100, 998 -> 999. Deleted: 777.
#[cfg(test)]
pub(crate) fn sample_tree() -> TaxonomyTree {
    let t = |id: u32, parent_id: u32, rank: Rank, name: &str| Taxon {
        id,
        parent_id,
        rank,
        name: name.to_string(),
    };
    let nodes = vec![
        t(1, 1, Rank::NoRank, "root"),
        t(2, 1, Rank::Superkingdom, "Bacteria"),
        t(3, 1, Rank::Superkingdom, "Archaea"),
        t(10, 2, Rank::Phylum, "Proteobacteria"),
        t(20, 10, Rank::Class, "Gammaproteobacteria"),
        t(30, 20, Rank::Order, "Enterobacterales"),
        t(40, 30, Rank::Family, "Enterobacteriaceae"),
        t(50, 40, Rank::Genus, "Escherichia"),
        t(51, 40, Rank::Genus, "Salmonella"),
        t(100, 50, Rank::Species, "Escherichia coli"),
        t(101, 50, Rank::Species, "Escherichia fergusonii"),
        t(102, 51, Rank::Species, "Salmonella enterica"),
        t(200, 100, Rank::NoRank, "Escherichia coli K-12"),
        t(60, 3, Rank::Phylum, "Euryarchaeota"),
        t(300, 60, Rank::Species, "Methanobrevibacter smithii"),
    ];
    TaxonomyTree::build(nodes, vec![(999, 100), (998, 999)], vec![777]).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32, parent_id: u32) -> Taxon {
        Taxon { id, parent_id, rank: Rank::NoRank, name: String::new() }
    }

    #[test]
    fn test_resolve_follows_merged_chain() {
        let tree = sample_tree();
        assert_eq!(tree.resolve(100).unwrap(), 100);
        assert_eq!(tree.resolve(999).unwrap(), 100);
        assert_eq!(tree.resolve(998).unwrap(), 100);
    }

    #[test]
    fn test_resolve_unknown_and_deleted() {
        let tree = sample_tree();
        let err = tree.resolve(12345).unwrap_err();
        assert!(matches!(err, TaxonomyError::UnknownTaxon(12345)));
        assert!(err.is_unknown_taxon());

        let err = tree.resolve(777).unwrap_err();
        assert!(matches!(err, TaxonomyError::DeletedTaxon(777)));
        assert!(err.is_unknown_taxon());
    }

    #[test]
    fn test_ancestors_end_at_root() {
        let tree = sample_tree();
        for taxon in tree.nodes.iter() {
            let path = tree.ancestors(taxon.id).unwrap();
            assert_eq!(path.first().unwrap().id, taxon.id);
            assert_eq!(path.last().unwrap().id, tree.root());
            assert!(path.len() <= tree.len());
        }
        let ids: Vec<u32> = tree.ancestors(200).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![200, 100, 50, 40, 30, 20, 10, 2, 1]);
    }

    #[test]
    fn test_root_rank_is_rewritten() {
        let tree = sample_tree();
        assert_eq!(tree.rank_of(1).unwrap(), Rank::Root);
        assert_eq!(tree.rank_of(999).unwrap(), Rank::Species);
        assert_eq!(tree.name_of(998), Some("Escherichia coli"));
    }

    #[test]
    fn test_lca() {
        let tree = sample_tree();
        assert_eq!(tree.lca(100, 101).unwrap(), 50);
        assert_eq!(tree.lca(100, 102).unwrap(), 40);
        assert_eq!(tree.lca(200, 100).unwrap(), 100);
        assert_eq!(tree.lca(100, 300).unwrap(), 1);
        assert_eq!(tree.lca_of([100, 101, 200]).unwrap(), Some(50));
        assert_eq!(tree.lca_of(Vec::<u32>::new()).unwrap(), None);
    }

    #[test]
    fn test_is_ancestor_and_rank_lookup() {
        let tree = sample_tree();
        assert!(tree.is_ancestor(50, 200));
        assert!(!tree.is_ancestor(200, 50));
        assert!(!tree.is_ancestor(50, 50));
        assert_eq!(tree.ancestor_at_rank(200, Rank::Genus).unwrap().id, 50);
        assert!(tree.ancestor_at_rank(300, Rank::Genus).is_none());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let nodes = vec![node(1, 1), node(2, 3), node(3, 4), node(4, 2)];
        let err = TaxonomyTree::build(nodes, vec![], vec![]).unwrap_err();
        assert!(matches!(err, TaxonomyError::CycleDetected { .. }));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_missing_and_multiple_roots() {
        let err = TaxonomyTree::build(vec![node(2, 3), node(3, 2)], vec![], vec![]).unwrap_err();
        assert!(matches!(err, TaxonomyError::MissingRoot));

        let err = TaxonomyTree::build(vec![node(1, 1), node(5, 5)], vec![], vec![]).unwrap_err();
        assert!(matches!(err, TaxonomyError::MultipleRoots { first: 1, second: 5 }));
    }

    #[test]
    fn test_dangling_parent() {
        let err = TaxonomyTree::build(vec![node(1, 1), node(2, 42)], vec![], vec![]).unwrap_err();
        assert!(matches!(err, TaxonomyError::DanglingParent { taxon: 2, parent: 42 }));
    }

    #[test]
    fn test_merged_cycle_and_dead_alias() {
        let err = TaxonomyTree::build(vec![node(1, 1)], vec![(7, 8), (8, 7)], vec![]).unwrap_err();
        assert!(matches!(err, TaxonomyError::CycleDetected { .. }));

        let tree = TaxonomyTree::build(vec![node(1, 1)], vec![(7, 9)], vec![]).unwrap();
        assert!(tree.resolve(7).is_err());
    }

    #[test]
    fn test_parse_taxdb_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxDB");
        std::fs::write(
            &path,
            "1\t1\troot\tno rank\n2\t1\tBacteria\tsuperkingdom\nbroken line\n50\t2\tEscherichia\tgenus\n",
        )
        .unwrap();
        let merged = dir.path().join("merged.tsv");
        std::fs::write(&merged, "60\t50\n").unwrap();

        let tree = load_taxdb(&path, Some(merged.as_path())).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.resolve(60).unwrap(), 50);
        assert_eq!(tree.rank_of(50).unwrap(), Rank::Genus);
    }

    #[test]
    fn test_parse_taxdb_bad_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxDB");
        std::fs::write(&path, "1\t1\troot\tno rank\nx2\t1\tBacteria\tsuperkingdom\n").unwrap();
        let err = parse_taxdb(&path).unwrap_err();
        assert!(matches!(err, TaxonomyError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_load_ncbi_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("nodes.dmp"),
            "1\t|\t1\t|\tno rank\t|\t\t|\n\
             2\t|\t1\t|\tsuperkingdom\t|\t\t|\n\
             562\t|\t2\t|\tspecies\t|\tEC\t|\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("names.dmp"),
            "1\t|\troot\t|\t\t|\tscientific name\t|\n\
             2\t|\tBacteria\t|\tBacteria <bacteria>\t|\tscientific name\t|\n\
             2\t|\teubacteria\t|\t\t|\tgenbank common name\t|\n\
             562\t|\tEscherichia coli\t|\t\t|\tscientific name\t|\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("merged.dmp"), "1637730\t|\t562\t|\n").unwrap();
        std::fs::write(dir.path().join("delnodes.dmp"), "3\t|\n").unwrap();

        let tree = load_ncbi_dir(dir.path()).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.name_of(2), Some("Bacteria"));
        assert_eq!(tree.resolve(1637730).unwrap(), 562);
        assert!(matches!(tree.resolve(3), Err(TaxonomyError::DeletedTaxon(3))));
    }

    #[test]
    fn test_load_ncbi_dir_requires_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_ncbi_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TaxonomyError::Io { .. }));
    }
}
