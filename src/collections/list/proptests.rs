use std::collections::VecDeque;
use std::println;
use std::vec::Vec;

use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;
use proptest::test_runner::Config;
use proptest_derive::Arbitrary;
use proptest_state_machine::{ReferenceStateMachine, StateMachineTest};
use rand::Rng;

use super::*;

proptest_state_machine::prop_state_machine! {
    #![proptest_config(Config {
        failure_persistence: None,
        verbose: 1,
        .. Config::default()
    })]

    #[test]
    fn list_state_machine_test(
        sequential
        100..500
        =>
        List<u32>
    );
}

/// The possible transitions of the state machine. Positions are drawn as an
/// `Index` and resolved against the length at the time they are applied.
#[derive(Clone, Debug)]
pub enum Transition {
    PushFront(u32),
    PopFront,
    PushBack(u32),
    PopBack,
    InsertBefore(Index, u32),
    EraseAt(Index),
    EraseRange(Index, Index),
    Clear,
}

pub struct ListStateMachine;

impl ReferenceStateMachine for ListStateMachine {
    type State = VecDeque<u32>;
    type Transition = Transition;

    fn init_state() -> BoxedStrategy<Self::State> {
        Just(VecDeque::new()).boxed()
    }

    fn transitions(_state: &Self::State) -> BoxedStrategy<Self::Transition> {
        prop_oneof![
            1 => Just(Transition::PopFront),
            2 => (any::<u32>()).prop_map(Transition::PushFront),
            1 => Just(Transition::PopBack),
            2 => (any::<u32>()).prop_map(Transition::PushBack),
            2 => (any::<Index>(), any::<u32>()).prop_map(|(i, v)| Transition::InsertBefore(i, v)),
            1 => any::<Index>().prop_map(Transition::EraseAt),
            1 => (any::<Index>(), any::<Index>()).prop_map(|(a, b)| Transition::EraseRange(a, b)),
            1 => Just(Transition::Clear),
        ]
        .boxed()
    }

    fn apply(mut state: Self::State, transition: &Self::Transition) -> Self::State {
        match transition {
            Transition::PopFront => {
                state.pop_front();
            }
            Transition::PushFront(value) => state.push_front(*value),
            Transition::PopBack => {
                state.pop_back();
            }
            Transition::PushBack(value) => state.push_back(*value),
            Transition::InsertBefore(index, value) => {
                let at = index.index(state.len() + 1);
                state.insert(at, *value);
            }
            Transition::EraseAt(index) => {
                if !state.is_empty() {
                    let at = index.index(state.len());
                    state.remove(at);
                }
            }
            Transition::EraseRange(a, b) => {
                let (start, end) = range_of(a, b, state.len());
                state.drain(start..end);
            }
            Transition::Clear => state.clear(),
        }
        state
    }
}

/// an ordered, in-bounds pair of positions in `0..=len`
fn range_of(a: &Index, b: &Index, len: usize) -> (usize, usize) {
    let a = a.index(len + 1);
    let b = b.index(len + 1);
    (a.min(b), a.max(b))
}

impl StateMachineTest for List<u32> {
    type SystemUnderTest = Self;
    type Reference = ListStateMachine;

    fn init_test(
        _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
    ) -> Self::SystemUnderTest {
        List::new()
    }

    fn apply(
        mut state: Self::SystemUnderTest,
        _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        transition: Transition,
    ) -> Self::SystemUnderTest {
        match transition {
            Transition::PushFront(value) => state.push_front(value).expect("failed to push"),
            Transition::PopFront => {
                state.pop_front();
            }
            Transition::PushBack(value) => state.push_back(value).expect("failed to push"),
            Transition::PopBack => {
                state.pop_back();
            }
            Transition::InsertBefore(index, value) => {
                let at = index.index(state.len() + 1);
                state
                    .cursor_at_mut(at)
                    .insert_before(value)
                    .expect("failed to insert");
            }
            Transition::EraseAt(index) => {
                if !state.is_empty() {
                    let at = index.index(state.len());
                    assert!(state.cursor_at_mut(at).erase_current());
                }
            }
            Transition::EraseRange(a, b) => {
                let (start, end) = range_of(&a, &b, state.len());
                assert_eq!(state.erase_range(start..end), end - start);
            }
            Transition::Clear => state.clear(),
        }
        state
    }

    fn check_invariants(
        state: &Self::SystemUnderTest,
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
    ) {
        assert_eq!(state.len(), ref_state.len());
        assert_eq!(state.is_empty(), ref_state.is_empty());
        assert_eq!(state.front(), ref_state.front());
        assert_eq!(state.back(), ref_state.back());
        assert!(state.iter().eq(ref_state.iter()));
        assert!(state.iter().rev().eq(ref_state.iter().rev()));
    }
}

#[derive(Arbitrary, Debug)]
enum Operation {
    PushBack(u32),
    PushFront(u32),
    PopBack,
    PopFront,
    InsertAtRandom(u32),
    EraseAtRandom,
    CloneAndCompare,
    TakeAndRestore,
    Iterate,
}

proptest! {
    #[test]
    #[ignore]
    fn longform(ops in vec(any::<Operation>(), 2048)) {
        println!("Executing {} operations against List\n\t{:?}", ops.len(), ops);

        let mut reference: Vec<u32> = Vec::new();
        let counting = crate::memory::alloc::Counting::new(Global);
        let mut ll = List::new_in(&counting);

        for op in ops.iter() {
            match op {
                Operation::PushBack(v) => {
                    reference.push(*v);
                    ll.push_back(*v).expect("failed to push");
                }
                Operation::PushFront(v) => {
                    reference.insert(0, *v);
                    ll.push_front(*v).expect("failed to push");
                }
                Operation::PopBack => assert_eq!(ll.pop_back(), reference.pop()),
                Operation::PopFront => {
                    let expected = if reference.is_empty() {
                        None
                    } else {
                        Some(reference.remove(0))
                    };
                    assert_eq!(ll.pop_front(), expected);
                }
                Operation::InsertAtRandom(v) => {
                    let at = rand::thread_rng().gen_range(0..=reference.len());
                    reference.insert(at, *v);
                    let mut cursor = ll.cursor_at_mut(at);
                    cursor.insert(*v).expect("failed to insert");
                    assert_eq!(cursor.index(), Some(at));
                }
                Operation::EraseAtRandom => {
                    if !reference.is_empty() {
                        let at = rand::thread_rng().gen_range(0..reference.len());
                        let expected = reference.remove(at);
                        assert_eq!(ll.cursor_at_mut(at).remove_current(), Some(expected));
                    }
                }
                Operation::CloneAndCompare => {
                    let copy = ll.clone();
                    assert_eq!(copy, ll);
                }
                Operation::TakeAndRestore => {
                    let mut taken = ll.take();
                    assert!(ll.is_empty());
                    ll.move_from(&mut taken);
                    assert!(taken.is_empty());
                }
                Operation::Iterate => {
                    let mut ref_iter = reference.iter();
                    let mut ll_iter = ll.iter();
                    loop {
                        match (ref_iter.next(), ll_iter.next()) {
                            (Some(ref_next), Some(ll_next)) => assert_eq!(ref_next, ll_next),
                            (Some(ref_next), None) => panic!("Reference iter returned: {:?} but list iter returned None", ref_next),
                            (None, Some(ll_next)) => panic!("List iter returned: {:?} but reference iter returned None", ll_next),
                            (None, None) => break,
                        }
                    }
                    assert!(ll.iter().rev().eq(reference.iter().rev()));
                }
            }
            assert_eq!(ll.len(), reference.len());
            // every element node plus the sentinel
            assert_eq!(counting.live(), reference.len() + 1);
        }

        drop(ll);
        assert_eq!(counting.live(), 0);
        println!("Successfully executed {} operations against List", ops.len());
    }
}
