use crate::error::RingError;
use crate::graph::MolGraph;
use crate::molecule::Ring;
use petgraph::unionfind::UnionFind;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

/// Connected components as sorted node lists, ordered by their smallest node.
pub fn connected_components<N, E>(graph: &MolGraph<N, E>) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let mut sets = UnionFind::<usize>::new(n);
    for edge in graph.edges() {
        if let Some((a, b)) = graph.endpoints(edge) {
            sets.union(a, b);
        }
    }
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for node in graph.nodes() {
        groups.entry(sets.find(node)).or_default().push(node);
    }
    let mut components: Vec<Vec<usize>> = groups.into_values().collect();
    components.sort_by_key(|c| c[0]);
    components
}

/// Size of the cycle space, `E - V + C`.
pub fn expected_ring_count<N, E>(graph: &MolGraph<N, E>) -> usize {
    (graph.edge_count() + connected_components(graph).len()).saturating_sub(graph.node_count())
}

/// Enumerates every simple cycle, each reported once.
///
/// A cycle is listed starting from its smallest node, walking towards the
/// smaller of that node's two cycle neighbours. `max_len` prunes the search to
/// cycles of at most that many nodes. The search fails closed once it has
/// expanded `budget` edges.
pub fn elementary_cycles<N, E>(
    graph: &MolGraph<N, E>,
    max_len: Option<usize>,
    budget: usize,
) -> Result<Vec<Ring>, RingError> {
    let adjacency = graph.adjacency();
    let n = adjacency.len();
    let limit = max_len.unwrap_or(n);
    let mut cycles = Vec::new();
    let mut steps = 0usize;
    let mut on_path = vec![false; n];

    for start in 0..n {
        let mut path = vec![start];
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        on_path[start] = true;

        while let Some(&(node, next)) = stack.last() {
            if next >= adjacency[node].len() {
                stack.pop();
                path.pop();
                on_path[node] = false;
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            steps += 1;
            if steps > budget {
                debug!(budget, "cycle search budget exhausted");
                return Err(RingError::TooComplex(budget));
            }

            let neighbor = adjacency[node][next];
            if neighbor == start {
                if path.len() >= 3 && path[1] < path[path.len() - 1] {
                    cycles.push(path.clone());
                }
            } else if neighbor > start && !on_path[neighbor] && path.len() < limit {
                on_path[neighbor] = true;
                path.push(neighbor);
                stack.push((neighbor, 0));
            }
        }
    }
    trace!(cycles = cycles.len(), steps, "enumerated elementary cycles");
    Ok(cycles)
}

/// Rotates a cycle to start at its smallest node, walking towards the smaller
/// neighbour.
pub fn normalize_ring(ring: &[usize]) -> Ring {
    let Some((start, _)) = ring.iter().enumerate().min_by_key(|&(_, &atom)| atom) else {
        return Vec::new();
    };
    let len = ring.len();
    let forward: Ring = (0..len).map(|i| ring[(start + i) % len]).collect();
    if len > 2 && forward[1] > forward[len - 1] {
        let mut backward = vec![forward[0]];
        backward.extend(forward[1..].iter().rev());
        backward
    } else {
        forward
    }
}

/// Smallest set of smallest rings: a minimum cycle basis of `E - V + C`
/// rings.
///
/// Candidates are the Horton cycles `P(v, x) + (x, y) + P(y, v)` built from
/// BFS shortest-path trees. They are taken greedily by ascending size, and a
/// candidate whose edge set is the symmetric difference of rings already
/// chosen is discarded.
pub fn sssr<N, E>(graph: &MolGraph<N, E>) -> Vec<Ring> {
    let target = expected_ring_count(graph);
    if target == 0 {
        return Vec::new();
    }

    let adjacency = graph.adjacency();
    let n = adjacency.len();
    let parents: Vec<Vec<Option<usize>>> = (0..n).map(|v| bfs_parents(&adjacency, v)).collect();

    let mut seen = HashSet::new();
    let mut candidates: Vec<Ring> = Vec::new();
    for v in 0..n {
        for edge in graph.edges() {
            let Some((x, y)) = graph.endpoints(edge) else {
                continue;
            };
            let (Some(path_x), Some(path_y)) = (
                tree_path(&parents[v], v, x),
                tree_path(&parents[v], v, y),
            ) else {
                continue;
            };
            let on_x: HashSet<usize> = path_x.iter().copied().collect();
            if path_y[1..].iter().any(|atom| on_x.contains(atom)) {
                continue;
            }
            let mut cycle = path_x;
            cycle.extend(path_y[1..].iter().rev());
            if cycle.len() < 3 {
                continue;
            }
            let ring = normalize_ring(&cycle);
            if seen.insert(ring.clone()) {
                candidates.push(ring);
            }
        }
    }
    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    let edge_index: HashMap<(usize, usize), usize> = graph
        .edges()
        .filter_map(|e| graph.endpoints(e).map(|(a, b)| (ordered(a, b), e)))
        .collect();
    let mut basis = CycleBasis::new(graph.edge_count());
    let mut rings = Vec::new();
    for candidate in candidates {
        let bits = basis.edge_vector(&candidate, &edge_index);
        if basis.insert(bits) {
            rings.push(candidate);
            if rings.len() == target {
                break;
            }
        }
    }
    debug!(rings = rings.len(), target, "computed SSSR");
    rings
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn bfs_parents(adjacency: &[Vec<usize>], root: usize) -> Vec<Option<usize>> {
    let mut parent = vec![None; adjacency.len()];
    let mut visited = vec![false; adjacency.len()];
    let mut queue = VecDeque::from([root]);
    visited[root] = true;
    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node] {
            if !visited[next] {
                visited[next] = true;
                parent[next] = Some(node);
                queue.push_back(next);
            }
        }
    }
    parent
}

/// Path from `root` to `target` along BFS tree edges.
fn tree_path(parent: &[Option<usize>], root: usize, target: usize) -> Option<Vec<usize>> {
    let mut path = vec![target];
    let mut node = target;
    while node != root {
        node = parent[node]?;
        path.push(node);
    }
    path.reverse();
    Some(path)
}

/// Rows of a GF(2) edge-incidence matrix kept in echelon form, keyed by their
/// highest set bit.
struct CycleBasis {
    words: usize,
    rows: HashMap<usize, Vec<u64>>,
}

impl CycleBasis {
    fn new(edges: usize) -> Self {
        CycleBasis {
            words: edges.div_ceil(64).max(1),
            rows: HashMap::new(),
        }
    }

    fn edge_vector(&self, ring: &[usize], edge_index: &HashMap<(usize, usize), usize>) -> Vec<u64> {
        let mut bits = vec![0u64; self.words];
        for (i, &atom) in ring.iter().enumerate() {
            let next = ring[(i + 1) % ring.len()];
            if let Some(&edge) = edge_index.get(&ordered(atom, next)) {
                bits[edge / 64] |= 1 << (edge % 64);
            }
        }
        bits
    }

    /// Adds the vector if it is independent of the current rows.
    fn insert(&mut self, mut bits: Vec<u64>) -> bool {
        while let Some(pivot) = highest_bit(&bits) {
            match self.rows.get(&pivot) {
                Some(row) => {
                    for (word, other) in bits.iter_mut().zip(row) {
                        *word ^= other;
                    }
                }
                None => {
                    self.rows.insert(pivot, bits);
                    return true;
                }
            }
        }
        false
    }
}

fn highest_bit(bits: &[u64]) -> Option<usize> {
    bits.iter()
        .enumerate()
        .rev()
        .find(|(_, word)| **word != 0)
        .map(|(i, word)| i * 64 + 63 - word.leading_zeros() as usize)
}

/// Biconnected decomposition of a graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Biconnected {
    /// Edge ids of each biconnected component, sorted.
    pub components: Vec<Vec<usize>>,
    /// Nodes whose removal disconnects their component, sorted.
    pub articulation_points: Vec<usize>,
    /// Edges whose removal disconnects their component, sorted.
    pub bridges: Vec<usize>,
}

/// Tarjan's low-link decomposition, run with an explicit stack.
pub fn biconnected_components<N, E>(graph: &MolGraph<N, E>) -> Biconnected {
    let n = graph.node_count();
    let incident: Vec<Vec<(usize, usize)>> = graph.nodes().map(|v| graph.incident(v)).collect();
    let mut discovery = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut time = 0usize;
    let mut edge_stack: Vec<usize> = Vec::new();
    let mut result = Biconnected::default();
    let mut articulation = BTreeSet::new();

    for root in 0..n {
        if discovery[root] != usize::MAX {
            continue;
        }
        discovery[root] = time;
        low[root] = time;
        time += 1;
        let mut root_children = 0;
        // (node, edge to its parent, next incident index)
        let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];

        while let Some(&(node, parent_edge, next)) = stack.last() {
            if next < incident[node].len() {
                if let Some(top) = stack.last_mut() {
                    top.2 += 1;
                }
                let (edge, other) = incident[node][next];
                if Some(edge) == parent_edge {
                    continue;
                }
                if discovery[other] == usize::MAX {
                    edge_stack.push(edge);
                    discovery[other] = time;
                    low[other] = time;
                    time += 1;
                    if node == root {
                        root_children += 1;
                    }
                    stack.push((other, Some(edge), 0));
                } else if discovery[other] < discovery[node] {
                    edge_stack.push(edge);
                    low[node] = low[node].min(discovery[other]);
                }
                continue;
            }

            stack.pop();
            let (Some(&(parent, _, _)), Some(tree_edge)) = (stack.last(), parent_edge) else {
                continue;
            };
            low[parent] = low[parent].min(low[node]);
            if low[node] >= discovery[parent] {
                if parent != root {
                    articulation.insert(parent);
                }
                let mut component = Vec::new();
                while let Some(edge) = edge_stack.pop() {
                    component.push(edge);
                    if edge == tree_edge {
                        break;
                    }
                }
                component.sort_unstable();
                result.components.push(component);
            }
            if low[node] > discovery[parent] {
                result.bridges.push(tree_edge);
            }
        }
        if root_children > 1 {
            articulation.insert(root);
        }
    }

    result.articulation_points = articulation.into_iter().collect();
    result.bridges.sort_unstable();
    result
}

/// Edges not contained in any cycle.
pub fn bridges<N, E>(graph: &MolGraph<N, E>) -> Vec<usize> {
    biconnected_components(graph).bridges
}

/// Nodes whose removal splits their connected component.
pub fn articulation_points<N, E>(graph: &MolGraph<N, E>) -> Vec<usize> {
    biconnected_components(graph).articulation_points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingSystemKind {
    Isolated,
    Fused,
    Spiro,
    Bridged,
}

/// Rings connected through shared atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct RingSystem {
    /// Indices into the ring list the system was built from.
    pub rings: Vec<usize>,
    pub atoms: Vec<usize>,
    /// Some pair of rings shares exactly one bond.
    pub fused: bool,
    /// Some pair of rings shares exactly one atom.
    pub spiro: bool,
    /// Some pair of rings shares more than one bond's worth of atoms.
    pub bridged: bool,
}

impl RingSystem {
    pub fn kind(&self) -> RingSystemKind {
        if self.bridged {
            RingSystemKind::Bridged
        } else if self.fused {
            RingSystemKind::Fused
        } else if self.spiro {
            RingSystemKind::Spiro
        } else {
            RingSystemKind::Isolated
        }
    }
}

/// Groups rings that share at least one atom and classifies how they join.
pub fn ring_systems(rings: &[Ring]) -> Vec<RingSystem> {
    let sets: Vec<BTreeSet<usize>> = rings.iter().map(|r| r.iter().copied().collect()).collect();
    let mut groups = UnionFind::<usize>::new(rings.len());
    let mut joins: Vec<(usize, usize, usize)> = Vec::new();
    for i in 0..rings.len() {
        for j in i + 1..rings.len() {
            let shared = sets[i].intersection(&sets[j]).count();
            if shared > 0 {
                groups.union(i, j);
                joins.push((i, j, shared));
            }
        }
    }

    let mut systems: BTreeMap<usize, RingSystem> = BTreeMap::new();
    for (index, set) in sets.iter().enumerate() {
        let system = systems.entry(groups.find(index)).or_insert_with(|| RingSystem {
            rings: Vec::new(),
            atoms: Vec::new(),
            fused: false,
            spiro: false,
            bridged: false,
        });
        system.rings.push(index);
        system.atoms.extend(set.iter().copied());
    }
    for (i, j, shared) in joins {
        let Some(system) = systems.get_mut(&groups.find(i)) else {
            continue;
        };
        match shared {
            1 => system.spiro = true,
            2 if shares_bond(&rings[i], &sets[j]) => system.fused = true,
            _ => system.bridged = true,
        }
    }

    let mut result: Vec<RingSystem> = systems
        .into_values()
        .map(|mut system| {
            system.atoms.sort_unstable();
            system.atoms.dedup();
            system
        })
        .collect();
    result.sort_by_key(|s| s.rings[0]);
    result
}

/// Whether two consecutive atoms of `ring` both lie in `other`.
fn shares_bond(ring: &[usize], other: &BTreeSet<usize>) -> bool {
    (0..ring.len()).any(|i| other.contains(&ring[i]) && other.contains(&ring[(i + 1) % ring.len()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::element::Element;
    use crate::molecule::Molecule;
    use crate::parse::smiles::parse_fragment;

    fn molecule(smiles: &str) -> Molecule {
        let (mol, errors) = parse_fragment(smiles, 0);
        assert!(errors.is_empty(), "{smiles}: {errors:?}");
        mol
    }

    fn ring_sizes(rings: &[Ring]) -> Vec<usize> {
        rings.iter().map(|r| r.len()).collect()
    }

    #[test]
    fn test_components() {
        let mol = molecule("CCC1CC1");
        assert_eq!(connected_components(mol.graph()), vec![vec![0, 1, 2, 3, 4]]);
        assert_eq!(expected_ring_count(mol.graph()), 1);

        let mut two = molecule("CC");
        two.add_atom(Atom::new(Element::O));
        assert_eq!(connected_components(two.graph()), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_cyclohexane() {
        let mol = molecule("C1CCCCC1");
        let cycles = elementary_cycles(mol.graph(), None, 1000).unwrap();
        assert_eq!(cycles, vec![vec![0, 1, 2, 3, 4, 5]]);
        assert_eq!(sssr(mol.graph()), vec![vec![0, 1, 2, 3, 4, 5]]);
    }

    #[test]
    fn test_naphthalene() {
        let mol = molecule("c1ccc2ccccc2c1");
        let cycles = elementary_cycles(mol.graph(), None, 10_000).unwrap();
        let mut sizes = ring_sizes(&cycles);
        sizes.sort_unstable();
        assert_eq!(sizes, vec![6, 6, 10]);

        let small = elementary_cycles(mol.graph(), Some(7), 10_000).unwrap();
        assert_eq!(ring_sizes(&small), vec![6, 6]);

        let rings = sssr(mol.graph());
        assert_eq!(ring_sizes(&rings), vec![6, 6]);
    }

    #[test]
    fn test_cubane() {
        let mol = molecule("C12C3C4C1C5C2C3C45");
        assert_eq!(mol.bond_count(), 12);
        let rings = sssr(mol.graph());
        assert_eq!(rings.len(), 5);
        assert!(rings.iter().all(|r| r.len() == 4));
    }

    #[test]
    fn test_cycle_budget() {
        let mol = molecule("c1ccccc1");
        assert_eq!(
            elementary_cycles(mol.graph(), None, 3),
            Err(RingError::TooComplex(3))
        );
    }

    #[test]
    fn test_normalize_ring() {
        assert_eq!(normalize_ring(&[3, 1, 4, 2]), vec![1, 3, 2, 4]);
        assert_eq!(normalize_ring(&[5, 0, 2]), vec![0, 2, 5]);
    }

    #[test]
    fn test_biconnected() {
        // Two cyclopropanes joined through a methylene.
        let mol = molecule("C1CC1CC2CC2");
        let result = biconnected_components(mol.graph());
        assert_eq!(result.components.len(), 4);
        assert_eq!(result.articulation_points, vec![2, 3, 4]);
        let bridge_pairs: Vec<(usize, usize)> = result
            .bridges
            .iter()
            .map(|&b| mol.bond_endpoints(b))
            .collect();
        assert_eq!(bridge_pairs, vec![(2, 3), (3, 4)]);

        let chain = molecule("CCC");
        assert_eq!(bridges(chain.graph()).len(), 2);
        assert_eq!(articulation_points(chain.graph()), vec![1]);

        let ring = molecule("C1CCC1");
        assert!(bridges(ring.graph()).is_empty());
        assert!(articulation_points(ring.graph()).is_empty());
    }

    #[test]
    fn test_ring_systems() {
        let naphthalene = sssr(molecule("c1ccc2ccccc2c1").graph());
        let systems = ring_systems(&naphthalene);
        assert_eq!(systems.len(), 1);
        assert_eq!(systems[0].kind(), RingSystemKind::Fused);
        assert_eq!(systems[0].atoms.len(), 10);

        let spiro = sssr(molecule("C1CCC2(C1)CCC2").graph());
        assert_eq!(ring_systems(&spiro)[0].kind(), RingSystemKind::Spiro);

        let norbornane = sssr(molecule("C1CC2CCC1C2").graph());
        assert_eq!(ring_sizes(&norbornane), vec![5, 5]);
        assert_eq!(ring_systems(&norbornane)[0].kind(), RingSystemKind::Bridged);

        let biphenyl = sssr(molecule("c1ccccc1-c2ccccc2").graph());
        let systems = ring_systems(&biphenyl);
        assert_eq!(systems.len(), 2);
        assert!(systems.iter().all(|s| s.kind() == RingSystemKind::Isolated));
    }
}
