// File: src/interpreter/code.rs
//
// Deep operations on code trees: point counting, preorder extraction and
// replacement, container search, concatenation and the discrepancy metric.
// A "point" addresses a tree in depth-first preorder — point 0 is the tree
// itself, point 1 its first child, and descending into a code child
// consumes points recursively. All point-addressed operations here are
// total: the index is reduced modulo the point count first.

use super::heap::Heap;
use super::value::{Val, Value};

/// Point count of a tree: 1 for any leaf, 1 + the children's counts for a
/// code node. Always at least 1.
pub fn size(heap: &Heap, val: Val) -> i64 {
    let mut total = 0;
    let mut work = vec![val];
    while let Some(v) = work.pop() {
        total += 1;
        if let Some(children) = heap.code_children(v) {
            work.extend_from_slice(children);
        }
    }
    total
}

/// Subtree at preorder point `point` (reduced modulo the point count)
pub fn extract(heap: &Heap, root: Val, point: i64) -> Val {
    let p = point.rem_euclid(size(heap, root));
    match extract_at(heap, root, p) {
        Ok(v) => v,
        Err(_) => root,
    }
}

fn extract_at(heap: &Heap, val: Val, point: i64) -> Result<Val, i64> {
    if point == 0 {
        return Ok(val);
    }
    let mut remaining = point - 1;
    if let Some(children) = heap.code_children(val) {
        for &child in children {
            match extract_at(heap, child, remaining) {
                Ok(found) => return Ok(found),
                Err(rest) => remaining = rest,
            }
        }
    }
    Err(remaining)
}

/// New tree equal to `root` with the subtree at preorder point `point`
/// (reduced modulo the point count) replaced by `replacement`. Untouched
/// siblings are shared between the old and new tree.
pub fn replace(heap: &mut Heap, root: Val, point: i64, replacement: Val) -> Val {
    let p = point.rem_euclid(size(heap, root));
    match replace_at(heap, root, p, replacement) {
        Ok(v) => v,
        Err(_) => root,
    }
}

fn replace_at(heap: &mut Heap, val: Val, point: i64, replacement: Val) -> Result<Val, i64> {
    if point == 0 {
        return Ok(replacement);
    }
    let mut remaining = point - 1;
    let children = match heap.code_children(val) {
        Some(children) => children.to_vec(),
        None => return Err(remaining),
    };
    for (i, &child) in children.iter().enumerate() {
        match replace_at(heap, child, remaining, replacement) {
            Ok(new_child) => {
                let mut rebuilt = children.clone();
                rebuilt[i] = new_child;
                return Ok(heap.alloc(Value::Code(rebuilt)));
            }
            Err(rest) => remaining = rest,
        }
    }
    Err(remaining)
}

/// Smallest sub-list of `haystack` containing a value structurally equal
/// to `needle`, searched depth-first left to right: each child is tested
/// for equality before being descended into. Returns the haystack itself
/// when the needle is one of its direct children, None when the needle
/// occurs nowhere.
pub fn container(heap: &Heap, haystack: Val, needle: Val) -> Option<Val> {
    let children = heap.code_children(haystack)?;
    for &child in children {
        if heap.equal(child, needle) {
            return Some(haystack);
        }
        if heap.is_code(child) {
            if let Some(found) = container(heap, child, needle) {
                return Some(found);
            }
        }
    }
    None
}

/// True when `needle` occurs anywhere inside `haystack` (at any depth)
pub fn contains(heap: &Heap, haystack: Val, needle: Val) -> bool {
    container(heap, haystack, needle).is_some()
}

/// New code list holding `a`'s children followed by `b`'s. Both inputs are
/// treated as lists (a non-list contributes itself as a single child);
/// neither input is mutated.
pub fn concat(heap: &mut Heap, a: Val, b: Val) -> Val {
    let mut children: Vec<Val> = match heap.code_children(a) {
        Some(c) => c.to_vec(),
        None => vec![a],
    };
    match heap.code_children(b) {
        Some(c) => children.extend_from_slice(c),
        None => children.push(b),
    }
    heap.alloc(Value::Code(children))
}

/// Index of the first direct child of `list` structurally equal to
/// `needle`, if any
pub fn index_of(heap: &Heap, list: Val, needle: Val) -> Option<usize> {
    let children = heap.code_children(list)?;
    children.iter().position(|&c| heap.equal(c, needle))
}

/// Every point of the tree in preorder, the tree itself first
pub fn points(heap: &Heap, root: Val, out: &mut Vec<Val>) {
    out.push(root);
    if let Some(children) = heap.code_children(root) {
        for &child in children {
            points(heap, child, out);
        }
    }
}

/// Structural distance between two trees: collect every point of both,
/// group the points by structural equality, and sum the per-item
/// difference in occurrence counts. Zero exactly when the trees are
/// structurally equal.
pub fn discrepancy(heap: &Heap, a: Val, b: Val) -> i64 {
    let mut points_a = Vec::new();
    let mut points_b = Vec::new();
    points(heap, a, &mut points_a);
    points(heap, b, &mut points_b);

    // distinct items drawn from both sides, by structural equality
    let mut items: Vec<Val> = Vec::new();
    for &p in points_a.iter().chain(points_b.iter()) {
        if !items.iter().any(|&q| heap.equal(p, q)) {
            items.push(p);
        }
    }

    let mut total = 0;
    for &item in &items {
        let in_a = points_a.iter().filter(|&&p| heap.equal(p, item)).count() as i64;
        let in_b = points_b.iter().filter(|&&p| heap.equal(p, item)).count() as i64;
        total += (in_a - in_b).abs();
    }
    total
}
